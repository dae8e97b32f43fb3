//! Integration tests for the Bannerfall engine.
//!
//! These tests verify complete game flows from deployment through to victory.

use bannerfall_core::*;
use pretty_assertions::assert_eq;

fn hex(q: i32, r: i32) -> HexCoord {
    HexCoord::new(q, r)
}

/// Deploy a unit and return its id
fn deploy(game: &mut GameState, player: Team, unit_type: UnitType, at: HexCoord) -> String {
    let events = game
        .apply_action(player, GameAction::PlaceUnit { unit_type, at })
        .expect("placement should succeed");
    match &events[0] {
        GameEvent::UnitPlaced { unit_id, .. } => unit_id.clone(),
        other => panic!("unexpected event {other:?}"),
    }
}

/// A game already in the play phase with the given units on the board
fn battle(units: Vec<Unit>) -> GameState {
    let mut game = GameState::with_seed(42);
    game.phase = GamePhase::Play;
    game.units = units;
    game
}

fn unit(id: &str, unit_type: UnitType, team: Team, at: HexCoord) -> Unit {
    Unit::new(id, unit_type, team, at)
}

fn attack(attacker: &str, target: &str) -> GameAction {
    GameAction::Attack {
        attacker_id: attacker.to_string(),
        target_id: target.to_string(),
    }
}

/// Pass the turn back to Player 1
fn pass_round(game: &mut GameState) {
    game.apply_action(Team::Player1, GameAction::EndTurn).unwrap();
    game.apply_action(Team::Player2, GameAction::EndTurn).unwrap();
}

#[test]
fn test_full_deployment_flow() {
    let mut game = GameState::with_seed(9);

    deploy(&mut game, Team::Player1, UnitType::Flag, hex(4, 0));
    deploy(&mut game, Team::Player1, UnitType::Warlord, hex(4, 1));
    deploy(&mut game, Team::Player1, UnitType::Mage, hex(3, 2));
    game.apply_action(Team::Player1, GameAction::PlacePlateau { at: hex(5, 3) })
        .unwrap();

    // Player 2 cannot act while Player 1 deploys
    assert_eq!(
        game.apply_action(Team::Player2, GameAction::Ready),
        Err(GameError::NotYourTurn)
    );
    game.apply_action(Team::Player1, GameAction::Ready).unwrap();
    assert_eq!(game.phase, GamePhase::SetupPlayer2);

    // Player 2 only sees its own side while deploying
    assert!(game.visible_units(Team::Player2).is_empty());

    deploy(&mut game, Team::Player2, UnitType::Flag, hex(4, 8));
    deploy(&mut game, Team::Player2, UnitType::Brute, hex(4, 6));
    let events = game.apply_action(Team::Player2, GameAction::Ready).unwrap();

    assert!(events.contains(&GameEvent::BattleStarted));
    assert_eq!(game.phase, GamePhase::Play);
    assert_eq!(game.current_player, Team::Player1);
    assert_eq!(game.actions_remaining, 2);
    assert_eq!(game.hand(Team::Player1).len(), 6);
    assert_eq!(game.hand(Team::Player2).len(), 6);
    assert_eq!(game.visible_units(Team::Player2).len(), 5);

    // Setup actions are over
    assert_eq!(
        game.apply_action(Team::Player1, GameAction::PlacePlateau { at: hex(2, 2) }),
        Err(GameError::InvalidPhase)
    );
}

#[test]
fn test_brute_attacks_archer_twice() {
    let mut game = battle(vec![
        unit("brute", UnitType::Brute, Team::Player1, hex(4, 4)),
        unit("archer", UnitType::Archer, Team::Player2, hex(4, 5)),
    ]);

    let events = game.apply_action(Team::Player1, attack("brute", "archer")).unwrap();
    assert_eq!(
        events[0],
        GameEvent::UnitAttacked {
            attacker_id: "brute".into(),
            target_id: "archer".into(),
            damage: 3,
            defeated: false,
        }
    );
    assert_eq!(game.unit("archer").unwrap().stats.hp, 1);
    assert_eq!(game.unit("brute").unwrap().position, hex(4, 4));

    // Same turn: the brute has already attacked
    assert_eq!(
        game.apply_action(Team::Player1, attack("brute", "archer")),
        Err(GameError::AlreadyAttacked)
    );

    pass_round(&mut game);
    let events = game.apply_action(Team::Player1, attack("brute", "archer")).unwrap();

    assert!(events.contains(&GameEvent::UnitDefeated {
        unit_id: "archer".into(),
        unit_type: UnitType::Archer,
        team: Team::Player2,
    }));
    assert!(game.unit("archer").is_none());
    assert_eq!(game.unit("brute").unwrap().position, hex(4, 5));

    let defeated: Vec<_> = game
        .log
        .entries()
        .iter()
        .filter(|e| e.kind == GameLogKind::UnitDefeated)
        .collect();
    assert_eq!(defeated.len(), 1);
    assert_eq!(defeated[0].message, "Archer was defeated!");
}

#[test]
fn test_assassin_adjacent_bonus() {
    let mut game = battle(vec![
        unit("assassin", UnitType::Assassin, Team::Player1, hex(4, 4)),
        unit("brute", UnitType::Brute, Team::Player2, hex(4, 5)),
    ]);

    game.apply_action(Team::Player1, attack("assassin", "brute"))
        .unwrap();
    assert_eq!(game.unit("brute").unwrap().stats.hp, 7 - 4);

    let entry = game
        .log
        .entries()
        .iter()
        .find(|e| e.kind == GameLogKind::Attack)
        .unwrap();
    assert_eq!(entry.damage, Some(4));
    assert_eq!(entry.message, "Assassin attacked Brute for 4 damage (Adjacent +3)");
}

#[test]
fn test_assassin_bonus_reduced_by_shield() {
    let mut game = battle(vec![
        unit("assassin", UnitType::Assassin, Team::Player1, hex(4, 4)),
        unit("brute", UnitType::Brute, Team::Player2, hex(4, 5)),
    ]);
    game.units[1].effects.push(
        Effect::new("shield", EffectKind::DamageReduction, EffectDuration::NextTurn, 2)
            .applied_on(0),
    );
    // Shield was raised during the previous turn
    game.turn_number = 1;

    game.apply_action(Team::Player1, attack("assassin", "brute"))
        .unwrap();
    assert_eq!(game.unit("brute").unwrap().stats.hp, 7 - 2);
}

#[test]
fn test_transfusion_heals_and_spends_card() {
    let mut game = battle(vec![
        unit("mage", UnitType::Mage, Team::Player1, hex(4, 3)),
        unit("archer", UnitType::Archer, Team::Player1, hex(4, 4)),
    ]);
    game.units[1].stats.hp = 2;
    let swift_foot = Card::new(
        "Swift Foot",
        CardType::Buff,
        CardRarity::Rare,
        "Target unit gains +1 Movement for this turn",
    );
    game.hands[Team::Player1.index()] = vec![
        Card::new(
            "Transfusion",
            CardType::Buff,
            CardRarity::Common,
            "Heal target unit plus 2 HP",
        ),
        swift_foot.clone(),
    ];

    let events = game
        .apply_action(
            Team::Player1,
            GameAction::CastCard {
                card_index: 0,
                caster_id: "mage".into(),
                target_id: "archer".into(),
            },
        )
        .unwrap();

    assert_eq!(
        events,
        vec![GameEvent::CardCast {
            team: Team::Player1,
            title: "Transfusion".into(),
            caster_id: "mage".into(),
            target_id: "archer".into(),
        }]
    );
    assert_eq!(game.unit("archer").unwrap().stats.hp, 4);
    assert!(game.unit("mage").unwrap().has_cast);
    assert_eq!(game.hand(Team::Player1), &[swift_foot][..]);
    // Casting is free
    assert_eq!(game.actions_remaining, 2);

    let last = game.log.entries().last().unwrap();
    assert_eq!(last.kind, GameLogKind::CardCast);
    assert_eq!(last.message, "Cast \"Transfusion\" on Archer");

    // One cast per mage per turn
    let again = game.apply_action(
        Team::Player1,
        GameAction::CastCard {
            card_index: 0,
            caster_id: "mage".into(),
            target_id: "archer".into(),
        },
    );
    assert_eq!(
        again,
        Err(GameError::CannotCast(
            "This unit has already cast a card this turn".into()
        ))
    );
}

#[test]
fn test_archer_plateau_bonus_follows_position() {
    let mut game = battle(vec![unit("archer", UnitType::Archer, Team::Player1, hex(4, 3))]);
    game.board.add_plateau(hex(4, 3), Team::Player1);

    let on_plateau =
        calculate_effective_stats(game.unit("archer").unwrap(), &game.board, game.turn_number);
    assert_eq!(on_plateau.attack, 3);
    assert_eq!(on_plateau.damage_reduction, 1);

    game.apply_action(
        Team::Player1,
        GameAction::Move {
            unit_id: "archer".into(),
            to: hex(4, 4),
        },
    )
    .unwrap();

    // Stepping down costs one action and the bonus stays behind
    assert_eq!(game.actions_remaining, 1);
    let off_plateau =
        calculate_effective_stats(game.unit("archer").unwrap(), &game.board, game.turn_number);
    assert_eq!(off_plateau.attack, 2);
    assert_eq!(off_plateau.damage_reduction, 0);
}

#[test]
fn test_two_actions_end_the_turn() {
    let mut game = battle(vec![
        unit("brute", UnitType::Brute, Team::Player1, hex(4, 3)),
        unit("archer", UnitType::Archer, Team::Player1, hex(2, 3)),
        unit("enemy", UnitType::Warlord, Team::Player2, hex(4, 5)),
    ]);

    game.apply_action(
        Team::Player1,
        GameAction::Move {
            unit_id: "brute".into(),
            to: hex(4, 4),
        },
    )
    .unwrap();
    assert_eq!(game.actions_remaining, 1);
    assert!(game.unit("brute").unwrap().has_moved);

    let events = game.apply_action(Team::Player1, attack("brute", "enemy")).unwrap();

    assert_eq!(
        events.last(),
        Some(&GameEvent::TurnEnded {
            player: Team::Player1,
            next_player: Team::Player2,
        })
    );
    assert_eq!(game.current_player, Team::Player2);
    assert_eq!(game.actions_remaining, 2);
    assert_eq!(game.turn_number, 1);
    for unit in &game.units {
        assert!(!unit.has_moved && !unit.has_attacked && !unit.has_cast);
        assert_eq!(unit.actions_used, 0);
    }

    let last = game.log.entries().last().unwrap();
    assert_eq!(last.kind, GameLogKind::TurnStart);
    assert_eq!(last.player, Team::Player2);
    assert_eq!(last.turn, 1);
}

#[test]
fn test_rejected_action_changes_nothing() {
    let mut game = battle(vec![
        unit("brute", UnitType::Brute, Team::Player1, hex(4, 3)),
        unit("enemy", UnitType::Brute, Team::Player2, hex(4, 4)),
    ]);
    let before = game.clone();

    let result = game.apply_action(
        Team::Player1,
        GameAction::Move {
            unit_id: "brute".into(),
            to: hex(4, 4),
        },
    );
    assert_eq!(result, Err(GameError::DestinationOccupied));
    assert_eq!(game, before);
}

fn axehound() -> Card {
    Card::new(
        "Axehound",
        CardType::Buff,
        CardRarity::Common,
        "Target Brute deals +1 Damage on its next attack",
    )
}

fn cast(card_index: usize, caster: &str, target: &str) -> GameAction {
    GameAction::CastCard {
        card_index,
        caster_id: caster.to_string(),
        target_id: target.to_string(),
    }
}

#[test]
fn test_next_turn_buff_lifecycle() {
    let mut game = battle(vec![
        unit("mage", UnitType::Mage, Team::Player1, hex(4, 2)),
        unit("brute", UnitType::Brute, Team::Player1, hex(4, 3)),
    ]);
    game.hands[Team::Player1.index()] = vec![axehound()];

    game.apply_action(Team::Player1, cast(0, "mage", "brute"))
        .unwrap();
    let attack_now = |game: &GameState| {
        let brute = game.unit("brute").unwrap();
        calculate_effective_stats(brute, &game.board, game.turn_number).attack
    };
    // Not yet active on the turn it was cast
    assert_eq!(attack_now(&game), 3);

    game.apply_action(Team::Player1, GameAction::EndTurn).unwrap();
    assert_eq!(attack_now(&game), 4);

    game.apply_action(Team::Player2, GameAction::EndTurn).unwrap();
    assert_eq!(attack_now(&game), 3);
    assert!(game.unit("brute").unwrap().effects.is_empty());
}

#[test]
fn test_next_turn_buff_does_not_boost_same_turn_attack() {
    let mut game = battle(vec![
        unit("mage", UnitType::Mage, Team::Player1, hex(4, 2)),
        unit("brute", UnitType::Brute, Team::Player1, hex(4, 4)),
        unit("warlord", UnitType::Warlord, Team::Player2, hex(4, 5)),
    ]);
    game.hands[Team::Player1.index()] = vec![axehound()];

    game.apply_action(Team::Player1, cast(0, "mage", "brute"))
        .unwrap();
    game.apply_action(Team::Player1, attack("brute", "warlord"))
        .unwrap();

    assert_eq!(game.unit("warlord").unwrap().stats.hp, 14 - 3);
}

#[test]
fn test_flag_capture_ends_the_game() {
    let mut game = battle(vec![
        unit("assassin", UnitType::Assassin, Team::Player1, hex(4, 5)),
        unit("flag", UnitType::Flag, Team::Player2, hex(4, 8)),
    ]);

    let events = game
        .apply_action(
            Team::Player1,
            GameAction::Move {
                unit_id: "assassin".into(),
                to: hex(4, 8),
            },
        )
        .unwrap();

    assert_eq!(events.last(), Some(&GameEvent::GameWon { player: Team::Player1 }));
    assert!(game.is_finished());
    assert_eq!(game.winner(), Some(Team::Player1));
    assert_eq!(
        game.apply_action(Team::Player1, GameAction::EndTurn),
        Err(GameError::GameOver)
    );
}

#[test]
fn test_reduce_matches_apply() {
    let game = battle(vec![
        unit("brute", UnitType::Brute, Team::Player1, hex(4, 4)),
        unit("archer", UnitType::Archer, Team::Player2, hex(4, 5)),
    ]);

    let (reduced, entries) = game.reduce(Team::Player1, attack("brute", "archer")).unwrap();
    let mut applied = game.clone();
    applied.apply_action(Team::Player1, attack("brute", "archer")).unwrap();

    assert_eq!(reduced, applied);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, GameLogKind::Attack);
    assert_eq!(game.unit("archer").unwrap().stats.hp, 4);
}

#[test]
fn test_cycling_is_deterministic_for_a_seed() {
    let play = || {
        let mut game = GameState::with_seed(5);
        deploy(&mut game, Team::Player1, UnitType::Flag, hex(4, 0));
        game.apply_action(Team::Player1, GameAction::Ready).unwrap();
        deploy(&mut game, Team::Player2, UnitType::Flag, hex(4, 8));
        game.apply_action(Team::Player2, GameAction::Ready).unwrap();
        game.apply_action(
            Team::Player1,
            GameAction::CycleCards {
                discard: vec![0, 1, 2],
            },
        )
        .unwrap();
        game
    };

    let first = play();
    let second = play();
    assert_eq!(first.hands, second.hands);
    assert_eq!(first.hand(Team::Player1).len(), 6);
    assert_eq!(first.actions_remaining, 1);
}

#[test]
fn test_snapshot_survives_json() {
    let mut game = battle(vec![
        unit("brute", UnitType::Brute, Team::Player1, hex(4, 4)),
        unit("archer", UnitType::Archer, Team::Player2, hex(4, 5)),
    ]);
    game.board.add_plateau(hex(2, 2), Team::Player1);
    game.apply_action(Team::Player1, attack("brute", "archer"))
        .unwrap();

    let restored = GameState::from_json(&game.to_json().unwrap()).unwrap();
    assert_eq!(restored, game);
    assert_eq!(restored.valid_moves("brute"), game.valid_moves("brute"));
}
