//! Wipe selection and deletion against the in-memory world.

use spawn_warden_core::{
    CellBounds, Epoch, OwnerKind, Position, ShardId, SpawnId, SpawnRecord, ThemeTable,
};
use spawn_warden_reconcile::{ReconcileError, Reconciler, WipeRequest};
use spawn_warden_world::{CountingCache, SpawnWorld};

fn brain_record(id: &str, x: f64, z: f64) -> SpawnRecord {
    SpawnRecord {
        id: SpawnId::new(id),
        shard: ShardId::new("shard-a"),
        kind: "creature".to_owned(),
        archetype: "mob".to_owned(),
        prototype: "goblin_grunt".to_owned(),
        variant: None,
        position: Position::flat(x, z),
        region: None,
        tier: None,
        owner: OwnerKind::Brain,
        locked: false,
        created_rev: 0,
        updated_rev: 0,
    }
}

fn populated_world() -> SpawnWorld {
    let mut world = SpawnWorld::new();
    world.seed_record(brain_record("brain:0:goblins:0_0:0:goblin_grunt", 5.0, 5.0));
    world.seed_record(brain_record("brain:1:goblins:0_1:0:goblin_archer", 5.0, 15.0));
    world.seed_record(brain_record("brain:0:bandits:1_0:0:bandit_scout", 15.0, 5.0));
    let mut editor = brain_record("editor-placed", 15.0, 15.0);
    editor.owner = OwnerKind::Editor;
    world.seed_record(editor);
    world
}

fn wipe_request() -> WipeRequest {
    WipeRequest {
        shard: ShardId::new("shard-a"),
        bounds: CellBounds::new(0, 1, 0, 1),
        cell_size: 10.0,
        margin: 0.0,
        theme: None,
        epoch: None,
        override_protected: false,
    }
}

#[test]
fn dry_run_selects_without_deleting() {
    let mut world = populated_world();
    let mut cache = CountingCache::new();
    let themes = ThemeTable::builtin();
    let mut req = wipe_request();
    req.theme = Some("goblins".to_owned());
    req.epoch = Some(Epoch::new(0));

    let plan = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_dry_run(&req)
        .expect("dry run");

    assert_eq!(plan.selection.count, 1);
    assert_eq!(
        plan.selection.selected,
        vec![SpawnId::new("brain:0:goblins:0_0:0:goblin_grunt")]
    );
    assert!(plan.confirm.is_some());
    assert_eq!(world.records(&req.shard).len(), 4);
    assert_eq!(cache.invalidations(), 0);
}

#[test]
fn commit_deletes_only_the_selection() {
    let mut world = populated_world();
    let mut cache = CountingCache::new();
    let themes = ThemeTable::builtin();
    let mut req = wipe_request();
    req.theme = Some("goblins".to_owned());
    req.epoch = Some(Epoch::new(0));

    let plan = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_dry_run(&req)
        .expect("dry run");
    let token = plan.confirm.expect("confirm token");

    let applied = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_commit(&req, Some(token.as_str()))
        .expect("commit");

    assert_eq!(applied.deleted, 1);
    let shard = req.shard.clone();
    assert!(world
        .record(&shard, &SpawnId::new("brain:0:goblins:0_0:0:goblin_grunt"))
        .is_none());
    assert!(world
        .record(&shard, &SpawnId::new("brain:1:goblins:0_1:0:goblin_archer"))
        .is_some());
    assert!(world
        .record(&shard, &SpawnId::new("brain:0:bandits:1_0:0:bandit_scout"))
        .is_some());
    assert_eq!(cache.invalidations(), 1);
}

#[test]
fn commit_without_token_is_rejected() {
    let mut world = populated_world();
    let mut cache = CountingCache::new();
    let themes = ThemeTable::builtin();
    let req = wipe_request();
    let before = world.records(&req.shard);

    let err = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_commit(&req, None)
        .expect_err("token required");
    assert!(matches!(err, ReconcileError::ConfirmRequired { .. }));
    assert_eq!(world.records(&req.shard), before);
    assert_eq!(cache.invalidations(), 0);
}

#[test]
fn unscoped_wipe_takes_every_system_record() {
    let mut world = populated_world();
    let mut cache = CountingCache::new();
    let themes = ThemeTable::builtin();
    let req = wipe_request();

    let plan = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_dry_run(&req)
        .expect("dry run");
    // The operator-owned record is never a candidate.
    assert_eq!(plan.selection.count, 3);
    let token = plan.confirm.expect("confirm token");

    let applied = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_commit(&req, Some(token.as_str()))
        .expect("commit");
    assert_eq!(applied.deleted, 3);
    assert_eq!(world.records(&req.shard).len(), 1);
    assert!(world
        .record(&req.shard, &SpawnId::new("editor-placed"))
        .is_some());
}

#[test]
fn locked_records_survive_unless_overridden() {
    let mut world = SpawnWorld::new();
    let mut locked = brain_record("brain:0:goblins:0_0:0:goblin_grunt", 5.0, 5.0);
    locked.locked = true;
    world.seed_record(locked);
    world.seed_record(brain_record("brain:0:goblins:0_1:1:goblin_archer", 5.0, 15.0));

    let mut cache = CountingCache::new();
    let themes = ThemeTable::builtin();
    let mut req = wipe_request();
    req.theme = Some("goblins".to_owned());

    let plan = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_dry_run(&req)
        .expect("dry run");
    assert_eq!(plan.selection.count, 2);
    assert_eq!(plan.protected.count, 1);
    let token = plan.confirm.expect("confirm token");

    let applied = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_commit(&req, Some(token.as_str()))
        .expect("commit");
    assert_eq!(applied.deleted, 1);
    assert!(world
        .record(&req.shard, &SpawnId::new("brain:0:goblins:0_0:0:goblin_grunt"))
        .is_some());

    req.override_protected = true;
    let plan = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_dry_run(&req)
        .expect("dry run");
    let token = plan.confirm.expect("confirm token");
    let applied = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_commit(&req, Some(token.as_str()))
        .expect("override commit");
    assert_eq!(applied.deleted, 1);
    assert!(world.records(&req.shard).is_empty());
}

#[test]
fn empty_selection_commits_without_a_token() {
    let mut world = populated_world();
    let mut cache = CountingCache::new();
    let themes = ThemeTable::builtin();
    let mut req = wipe_request();
    req.theme = Some("wolves".to_owned());

    let plan = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_dry_run(&req)
        .expect("dry run");
    assert_eq!(plan.selection.count, 0);
    assert!(plan.confirm.is_none());

    let applied = Reconciler::new(&mut world, &mut cache, &themes)
        .wipe_commit(&req, None)
        .expect("commit");
    assert_eq!(applied.deleted, 0);
    assert_eq!(world.records(&req.shard).len(), 4);
    // Nothing was made durable, so the cache must stay warm.
    assert_eq!(cache.invalidations(), 0);
}
