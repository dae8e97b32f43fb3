//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, MatchStatus, ServerMessage};
use crate::store::{MatchSnapshot, MatchStore, StoreError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    pub store: MatchStore,
    /// Mapping from player ID to their match ID
    pub player_matches: DashMap<Uuid, Uuid>,
    /// Mapping from player ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Tasks forwarding match snapshots to each player
    subscriptions: DashMap<Uuid, JoinHandle<()>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            store: MatchStore::new(),
            player_matches: DashMap::new(),
            player_senders: DashMap::new(),
            subscriptions: DashMap::new(),
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to both seats of a match.
    pub fn broadcast_to_match(&self, match_id: Uuid, msg: ServerMessage) {
        if let Ok(room) = self.store.room(match_id) {
            for player_id in room.player_ids() {
                self.send_to_player(player_id, msg.clone());
            }
        }
    }

    /// Broadcast a message to a match except one player.
    pub fn broadcast_to_match_except(&self, match_id: Uuid, except: Uuid, msg: ServerMessage) {
        if let Ok(room) = self.store.room(match_id) {
            for player_id in room.player_ids().into_iter().filter(|id| *id != except) {
                self.send_to_player(player_id, msg.clone());
            }
        }
    }

    fn send_error(&self, player_id: Uuid, message: impl Into<String>) {
        self.send_to_player(
            player_id,
            ServerMessage::Error {
                message: message.into(),
            },
        );
    }

    fn send_snapshot(&self, player_id: Uuid, snapshot: &MatchSnapshot) {
        if let Some(msg) = snapshot_message(snapshot) {
            self.send_to_player(player_id, msg);
        }
    }

    /// Forward every persisted snapshot of the match to this player.
    fn subscribe_player(&self, player_id: Uuid, match_id: Uuid) {
        let Ok(mut updates) = self.store.subscribe(match_id) else {
            return;
        };
        let Some(sender) = self.player_senders.get(&player_id).map(|s| s.value().clone()) else {
            return;
        };

        let task = tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(snapshot) => {
                        let Some(msg) = snapshot_message(&snapshot) else {
                            continue;
                        };
                        if sender.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Player {} skipped {} snapshots", player_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        if let Some(previous) = self.subscriptions.insert(player_id, task) {
            previous.abort();
        }
    }

    fn unsubscribe_player(&self, player_id: Uuid) {
        if let Some((_, task)) = self.subscriptions.remove(&player_id) {
            task.abort();
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot_message(snapshot: &MatchSnapshot) -> Option<ServerMessage> {
    match serde_json::to_value(&snapshot.state) {
        Ok(state) => Some(ServerMessage::Snapshot {
            version: snapshot.version,
            status: snapshot.status,
            state,
        }),
        Err(e) => {
            error!("Failed to encode snapshot {}: {}", snapshot.version, e);
            None
        }
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Bannerfall server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(player_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", player_id, e);
                    state.send_error(player_id, format!("Invalid message: {}", e));
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_player(player_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateMatch { player_name } => {
            leave_current_match(player_id, state);

            let (match_id, join_code) = state.store.create_match(player_id, player_name);
            state.player_matches.insert(player_id, match_id);
            state.subscribe_player(player_id, match_id);
            info!(
                "Player {} created match {} ({}), {} open",
                player_id,
                match_id,
                join_code,
                state.store.match_count()
            );

            state.send_to_player(player_id, ServerMessage::MatchCreated { match_id, join_code });
            if let Ok(room) = state.store.room(match_id) {
                state.send_to_player(
                    player_id,
                    ServerMessage::JoinedMatch {
                        info: room.to_info(),
                        team: room.host.team,
                    },
                );
            }
            if let Ok(snapshot) = state.store.get_snapshot(match_id) {
                state.send_snapshot(player_id, &snapshot);
            }
        }

        ClientMessage::JoinMatch {
            join_code,
            player_name,
        } => {
            leave_current_match(player_id, state);

            match state.store.join_match(&join_code, player_id, player_name) {
                Ok((match_id, info)) => {
                    state.player_matches.insert(player_id, match_id);
                    state.subscribe_player(player_id, match_id);
                    info!("Player {} joined match {}", player_id, match_id);

                    let team = info
                        .seats
                        .iter()
                        .find(|seat| seat.id == player_id)
                        .map(|seat| seat.team);
                    if let Some(team) = team {
                        state.send_to_player(
                            player_id,
                            ServerMessage::JoinedMatch {
                                info: info.clone(),
                                team,
                            },
                        );
                    }
                    state.broadcast_to_match_except(
                        match_id,
                        player_id,
                        ServerMessage::MatchUpdated { info },
                    );
                    if let Ok(snapshot) = state.store.get_snapshot(match_id) {
                        state.send_snapshot(player_id, &snapshot);
                    }
                }
                Err(e) => {
                    debug!("Player {} failed to join {}: {}", player_id, join_code, e);
                    state.send_error(player_id, e.to_string());
                }
            }
        }

        ClientMessage::LeaveMatch => {
            if leave_current_match(player_id, state) {
                state.send_to_player(player_id, ServerMessage::LeftMatch);
            }
        }

        ClientMessage::SubmitAction {
            expected_version,
            action,
        } => {
            let Some(match_id) = state.player_matches.get(&player_id).map(|m| *m) else {
                state.send_error(player_id, "Not in a match");
                return;
            };

            match state
                .store
                .submit(match_id, player_id, expected_version, action)
            {
                Ok((snapshot, events)) => {
                    debug!(
                        "Match {} advanced to version {}",
                        match_id, snapshot.version
                    );
                    state.send_to_player(
                        player_id,
                        ServerMessage::ActionResult {
                            success: true,
                            events,
                            error: None,
                        },
                    );

                    if snapshot.status == MatchStatus::Completed {
                        announce_winner(match_id, &snapshot, state);
                    }
                }
                Err(e) => {
                    match &e {
                        StoreError::VersionConflict { expected, current } => warn!(
                            "Player {} submitted against version {} of match {}, current is {}",
                            player_id, expected, match_id, current
                        ),
                        other => debug!("Player {} action rejected: {}", player_id, other),
                    }
                    state.send_to_player(
                        player_id,
                        ServerMessage::ActionResult {
                            success: false,
                            events: vec![],
                            error: Some(e.to_string()),
                        },
                    );
                }
            }
        }

        ClientMessage::GetSnapshot => {
            let snapshot = state
                .player_matches
                .get(&player_id)
                .map(|m| *m)
                .ok_or(StoreError::MatchNotFound)
                .and_then(|match_id| state.store.get_snapshot(match_id));
            match snapshot {
                Ok(snapshot) => state.send_snapshot(player_id, &snapshot),
                Err(e) => state.send_error(player_id, e.to_string()),
            }
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

fn announce_winner(match_id: Uuid, snapshot: &MatchSnapshot, state: &Arc<ServerState>) {
    let Some(winner) = snapshot.state.winner() else {
        return;
    };
    let winner_name = state
        .store
        .room(match_id)
        .ok()
        .and_then(|room| room.winner_name(winner))
        .unwrap_or_else(|| winner.to_string());

    info!("Match {} won by {} ({})", match_id, winner, winner_name);
    state.broadcast_to_match(match_id, ServerMessage::GameOver { winner, winner_name });
}

/// Remove the player from whatever match they are in. Returns false if they were in none.
fn leave_current_match(player_id: Uuid, state: &Arc<ServerState>) -> bool {
    let Some((_, match_id)) = state.player_matches.remove(&player_id) else {
        return false;
    };
    state.unsubscribe_player(player_id);

    match state.store.leave_match(match_id, player_id) {
        Ok(Some(info)) => {
            state.broadcast_to_match_except(match_id, player_id, ServerMessage::MatchUpdated { info });
        }
        Ok(None) => info!("Match {} closed", match_id),
        Err(e) => debug!("Player {} leaving match {}: {}", player_id, match_id, e),
    }
    true
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    leave_current_match(player_id, state);
}
