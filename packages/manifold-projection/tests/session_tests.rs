//! Session-level tests: projection caching, invalidation and listener
//! delivery through `ProjectionSession`.

mod common;

use common::*;
use manifold_projection::{
    DeclKind, DiagnosticCode, FileChangeEvent, Fqn, InMemorySourceProducer, MemberKind,
    ProjectionConfig, ProjectionSession, PropertyAccess, RefreshKind, Resolution, SourceProducer,
    TypeLookup,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;

#[test]
fn test_repeated_lookups_share_one_projection() {
    let project = TestProject::new();
    project.add("a.A", "package a; public class A { int x; }");

    let first = project.get("a.A");
    let second = project.get("a.A");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(project.producer.produce_calls(), 1);
    assert_eq!(first.declaration().field("x").map(|f| f.name.as_str()), Some("x"));
}

#[test]
fn test_edit_invalidates_only_backed_projections() {
    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    project.add("a.B", "package a; class B {}");
    let a = project.get("a.A");
    let b = project.get("a.B");

    let requests = project.edit("a.A", "package a; class A { int added; }");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].module, project.module);
    assert_eq!(requests[0].types, vec![Fqn::new("a.A")]);

    assert!(!a.is_valid());
    assert!(b.is_valid());
    assert!(Arc::ptr_eq(&b, &project.get("a.B")));

    let rebuilt = project.get("a.A");
    assert!(rebuilt.declaration().field("added").is_some());
    assert_eq!(project.producer.produce_calls(), 3);
}

#[test]
fn test_nested_types_are_evicted_with_their_file() {
    let project = TestProject::new();
    project.add("a.Outer", "package a; class Outer { static class Inner {} }");
    let inner = project.get("a.Outer.Inner");
    let outer = project.get("a.Outer");

    project.edit("a.Outer", "package a; class Outer { static class Inner { int y; } }");
    assert!(!outer.is_valid());
    assert!(!inner.is_valid());
    assert!(project.get("a.Outer.Inner").declaration().field("y").is_some());
}

#[test]
fn test_unrelated_file_is_ignored() {
    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    let a = project.get("a.A");

    let journal = journal();
    let _sub = project.session.subscribe(RecordingListener::new("l", &journal), false);
    let requests = project
        .session
        .dispatch(FileChangeEvent::Modified(PathBuf::from("/elsewhere/Readme.java")));
    assert!(requests.is_empty());
    assert!(journal.lock().is_empty());
    assert!(a.is_valid());
}

#[test]
fn test_creation_notifies_early_then_late() {
    let project = TestProject::new();
    let journal = journal();
    let _late = project.session.subscribe(RecordingListener::new("late", &journal), false);
    let _early = project.session.subscribe(RecordingListener::new("early", &journal), true);

    project.create("a.New", "package a; class New {}");
    assert_eq!(order(&journal), vec!["early", "late"]);
    assert_eq!(
        journal.lock()[0],
        Heard::Types {
            listener: "early",
            kind: RefreshKind::Creation,
            types: vec!["a.New".to_string()],
        }
    );
}

#[test]
fn test_modification_and_deletion_notify_late_then_early() {
    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    project.get("a.A");

    let journal = journal();
    let _early = project.session.subscribe(RecordingListener::new("early", &journal), true);
    let _late = project.session.subscribe(RecordingListener::new("late", &journal), false);

    project.edit("a.A", "package a; class A { int x; }");
    assert_eq!(order(&journal), vec!["late", "early"]);

    project.get("a.A");
    journal.lock().clear();
    project.delete("a.A");
    assert_eq!(order(&journal), vec!["late", "early"]);
    assert!(matches!(
        journal.lock()[0],
        Heard::Types { kind: RefreshKind::Deletion, .. }
    ));
    assert!(project.session.get_projection(project.module, "a.A").is_none());
}

#[test]
fn test_late_listener_sees_old_state_early_listener_sees_new() {
    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    let original = project.get("a.A");

    let journal = journal();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let late_seen = seen.clone();
    let before = original.clone();
    let _late = project.session.subscribe(
        RecordingListener::observing("late", &journal, move |_| {
            late_seen.lock().push(("late", before.is_valid()));
        }),
        false,
    );
    let early_seen = seen.clone();
    let after = original.clone();
    let _early = project.session.subscribe(
        RecordingListener::observing("early", &journal, move |_| {
            early_seen.lock().push(("early", after.is_valid()));
        }),
        true,
    );

    project.edit("a.A", "package a; class A { int x; }");
    assert_eq!(*seen.lock(), vec![("late", true), ("early", false)]);
}

#[test]
fn test_dropped_subscription_stops_delivery() {
    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    let journal = journal();

    let kept = project.session.subscribe(RecordingListener::new("kept", &journal), false);
    let dropped = project.session.subscribe(RecordingListener::new("dropped", &journal), false);
    drop(dropped);

    project.get("a.A");
    project.edit("a.A", "package a; class A { int x; }");
    assert_eq!(order(&journal), vec!["kept"]);
    assert!(kept.is_active());
}

#[test]
fn test_duplicate_subscription_delivers_once() {
    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    let journal = journal();
    let listener = RecordingListener::new("once", &journal);

    let _first = project.session.subscribe(listener.clone(), false);
    let _second = project.session.subscribe(listener.clone(), true);

    project.get("a.A");
    project.edit("a.A", "package a; class A { int x; }");
    assert_eq!(order(&journal), vec!["once"]);

    assert!(project.session.unsubscribe(&listener));
    assert!(!project.session.unsubscribe(&listener));
}

#[test]
fn test_creation_clears_cached_miss() {
    let project = TestProject::new();
    assert!(matches!(
        project.session.resolve(project.module, "a.Later"),
        Resolution::NotFound
    ));

    project.add("a.Later", "package a; class Later {}");
    assert!(project.session.get_projection(project.module, "a.Later").is_none());

    project.session.dispatch(FileChangeEvent::Created(file_for("a.Later")));
    assert!(project.session.get_projection(project.module, "a.Later").is_some());
}

#[test]
fn test_creation_in_dependency_clears_dependent_misses() {
    let session = ProjectionSession::new(ProjectionConfig::default()).unwrap();
    let app = session.add_module("app");
    let lib = session.add_module("lib");
    session.add_dependency(app, lib, false).unwrap();
    let lib_producer = Arc::new(InMemorySourceProducer::primary("lib"));
    session.add_producer(lib, lib_producer.clone()).unwrap();

    assert!(session.get_projection(app, "l.Util").is_none());

    lib_producer.insert("l.Util", "package l; public class Util {}", vec![file_for("l.Util")]);
    let requests = session.dispatch(FileChangeEvent::Created(file_for("l.Util")));
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].module, lib);

    let util = session.get_projection(app, "l.Util").unwrap();
    assert_eq!(util.module(), lib);
}

#[test]
fn test_dependency_visibility_is_one_way() {
    let session = ProjectionSession::new(ProjectionConfig::default()).unwrap();
    let app = session.add_module("app");
    let lib = session.add_module("lib");
    session.add_dependency(app, lib, false).unwrap();
    session
        .add_producer(
            app,
            Arc::new(InMemorySourceProducer::primary("app").with_type(
                "a.Main",
                "package a; class Main {}",
                file_for("a.Main"),
            )),
        )
        .unwrap();
    session
        .add_producer(
            lib,
            Arc::new(InMemorySourceProducer::primary("lib").with_type(
                "l.Util",
                "package l; public class Util {}",
                file_for("l.Util"),
            )),
        )
        .unwrap();

    assert!(session.get_projection(app, "l.Util").is_some());
    assert!(session.get_projection(lib, "a.Main").is_none());
    assert_eq!(
        session.all_type_names(app),
        vec![Fqn::new("a.Main"), Fqn::new("l.Util")]
    );
    assert_eq!(session.all_type_names(lib), vec![Fqn::new("l.Util")]);
}

#[test]
fn test_conflicting_producers_yield_error_declaration() {
    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    let rival = InMemorySourceProducer::primary("rival").with_type(
        "a.A",
        "package a; class A { int other; }",
        "/rival/a/A.java",
    );
    project.session.add_producer(project.module, Arc::new(rival)).unwrap();

    let a = project.get("a.A");
    assert!(a.is_error());
    assert_eq!(a.declaration().kind, DeclKind::Error);
    assert_eq!(
        a.declaration().diagnostics[0].code,
        DiagnosticCode::ConflictingProducers
    );
    assert!(project.session.augmentation(&a).is_empty());
}

#[test]
fn test_malformed_text_is_absent_until_fixed() {
    let project = TestProject::new();
    project.add("a.Bad", "package a; class Bad {");
    assert!(project.session.get_projection(project.module, "a.Bad").is_none());
    assert!(project.session.cache().is_empty());

    project.edit("a.Bad", "package a; class Bad {}");
    assert!(project.session.get_projection(project.module, "a.Bad").is_some());
}

#[test]
fn test_producer_lookup_of_own_name_is_in_progress() {
    let project = TestProject::new();
    project.add("a.Self", "package a; class Self {}");
    project.add("a.Other", "package a; class Other {}");

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let record = seen.clone();
    project.producer.set_hook(Arc::new(move |fqn: &Fqn, lookup: &dyn TypeLookup| {
        if fqn.as_str() == "a.Self" {
            let own = lookup.lookup("a.Self").is_in_progress();
            let other = lookup.lookup("a.Other").is_found();
            record.lock().extend([own, other]);
        }
    }));

    project.get("a.Self");
    assert_eq!(*seen.lock(), vec![true, true]);
    assert!(project.session.cache().peek(project.module, &Fqn::new("a.Other")).is_some());
}

#[test]
fn test_refresh_all_notifies_everyone() {
    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    let a = project.get("a.A");
    let journal = journal();
    let _late = project.session.subscribe(RecordingListener::new("late", &journal), false);
    let _early = project.session.subscribe(RecordingListener::new("early", &journal), true);

    project.session.refresh_all();
    assert!(!a.is_valid());
    assert!(project.session.cache().is_empty());
    assert_eq!(
        *journal.lock(),
        vec![Heard::All { listener: "early" }, Heard::All { listener: "late" }]
    );
}

#[test]
fn test_module_descriptor_change_refreshes_everything() {
    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    let a = project.get("a.A");
    let journal = journal();
    let _sub = project.session.subscribe(RecordingListener::new("l", &journal), false);

    let requests = project
        .session
        .dispatch(FileChangeEvent::Modified(PathBuf::from("/src/module-info.java")));
    assert!(requests.is_empty());
    assert!(!a.is_valid());
    assert_eq!(*journal.lock(), vec![Heard::All { listener: "l" }]);
}

#[test]
fn test_edit_recomputes_augmentation() {
    let project = TestProject::new();
    project.add("a.Bean", "package a; public class Bean { public String getName() { return null; } }");
    let before = project.augment("a.Bean");
    assert!(before.member("name", manifold_projection::MemberKind::Field).is_some());

    project.edit("a.Bean", "package a; public class Bean { public String getTitle() { return null; } }");
    let after = project.augment("a.Bean");
    assert!(after.member("name", manifold_projection::MemberKind::Field).is_none());
    assert!(after.member("title", manifold_projection::MemberKind::Field).is_some());
}

#[test]
fn test_session_as_file_event_sink() {
    use manifold_projection::FileEventSink;

    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    let a = project.get("a.A");
    assert!(project.session.is_tracked(&file_for("a.A")));

    project.session.on_file_event(FileChangeEvent::Deleted(file_for("a.A")));
    assert!(!a.is_valid());
    assert!(!project.session.is_tracked(&file_for("a.A")));
}

#[test]
fn test_dispose_drops_listeners_and_projections() {
    let project = TestProject::new();
    project.add("a.A", "package a; class A {}");
    project.get("a.A");
    let journal = journal();
    let sub = project.session.subscribe(RecordingListener::new("l", &journal), false);

    project.session.dispose();
    assert!(!sub.is_active());
    assert!(project.session.get_projection(project.module, "a.A").is_none());
    assert!(project
        .session
        .dispatch(FileChangeEvent::Modified(file_for("a.A")))
        .is_empty());
    assert!(journal.lock().is_empty());
}

#[test]
fn test_directory_producer_feeds_session() {
    use manifold_projection::DirectorySourceProducer;

    let dir = tempfile::tempdir().unwrap();
    let pkg = dir.path().join("d");
    std::fs::create_dir_all(&pkg).unwrap();
    let file = pkg.join("Dir.java");
    std::fs::write(&file, "package d; public class Dir { int n; }").unwrap();

    let session = ProjectionSession::new(ProjectionConfig::default()).unwrap();
    let module = session.add_module("disk");
    let producer = DirectorySourceProducer::new(dir.path());
    assert!(producer.is_type(&Fqn::new("d.Dir")));
    session.add_producer(module, Arc::new(producer)).unwrap();

    let projection = session.get_projection(module, "d.Dir").unwrap();
    assert!(projection.declaration().field("n").is_some());

    std::fs::write(&file, "package d; public class Dir { int m; }").unwrap();
    session.dispatch(FileChangeEvent::Modified(file));
    let rebuilt = session.get_projection(module, "d.Dir").unwrap();
    assert!(rebuilt.declaration().field("m").is_some());
}

#[test]
fn test_lookup_back_into_type_under_construction() {
    let project = TestProject::new();
    project.add("a.X", "package a; class X {}");
    project.add("a.Y", "package a; class Y {}");

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let record = seen.clone();
    project.producer.set_hook(Arc::new(move |fqn: &Fqn, lookup: &dyn TypeLookup| {
        // Lock only after the nested lookup returns
        match fqn.as_str() {
            "a.X" => {
                let found = lookup.lookup("a.Y").is_found();
                record.lock().push(("X->Y", found));
            }
            "a.Y" => {
                let in_progress = lookup.lookup("a.X").is_in_progress();
                record.lock().push(("Y->X", in_progress));
            }
            _ => {}
        }
    }));

    let x = project.get("a.X");
    assert_eq!(*seen.lock(), vec![("Y->X", true), ("X->Y", true)]);
    assert!(x.is_valid());

    // Y was built and published inside X's build
    let y = project
        .session
        .cache()
        .peek(project.module, &Fqn::new("a.Y"))
        .and_then(|node| node.projection().cloned())
        .unwrap();
    assert!(y.is_valid());
    assert!(Arc::ptr_eq(&y, &project.get("a.Y")));
    assert_eq!(project.producer.produce_calls(), 2);
}

fn versioned_source(index: usize, version: usize) -> String {
    format!(
        "package s; public class T{index} extends Base {{\n\
           public int getValue() {{ return {version}; }}\n\
           public String getV{version}() {{ return null; }}\n\
         }}"
    )
}

#[test]
fn test_concurrent_lookups_and_edits_settle_consistently() {
    const THREADS: usize = 8;
    const TYPES: usize = 20;
    const OPS: usize = 300;

    let project = TestProject::new();
    project.add("s.Base", "package s; public class Base { public void setValue(int v) {} }");
    for index in 0..TYPES {
        project.add(&format!("s.T{index}"), &versioned_source(index, 0));
    }

    // Each thread edits only the types it owns, so its counters are final
    let per_thread: Vec<Vec<usize>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|thread| {
                let project = &project;
                scope.spawn(move || {
                    let mut versions = vec![0usize; TYPES];
                    let mut state = (thread as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
                    for op in 0..OPS {
                        state = state
                            .wrapping_mul(6_364_136_223_846_793_005)
                            .wrapping_add(1_442_695_040_888_963_407);
                        let index = (state >> 33) as usize % TYPES;
                        let fqn = format!("s.T{index}");
                        match op % 3 {
                            0 if index % THREADS == thread => {
                                versions[index] += 1;
                                project.edit(&fqn, &versioned_source(index, versions[index]));
                            }
                            1 => {
                                let projection =
                                    project.session.get_projection(project.module, &fqn).unwrap();
                                let fields = project
                                    .session
                                    .get_augmented_members(&projection, MemberKind::Field);
                                let value = fields.iter().find(|m| m.name == "value").unwrap();
                                assert_eq!(value.property_access(), Some(PropertyAccess::ReadWrite));
                            }
                            _ => {
                                project.session.dispatch(FileChangeEvent::Modified(file_for(&fqn)));
                                assert!(project.session.get_projection(project.module, &fqn).is_some());
                            }
                        }
                    }
                    versions
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for index in 0..TYPES {
        let expected = per_thread[index % THREADS][index];
        let fqn = format!("s.T{index}");
        let projection = project.get(&fqn);
        assert!(projection.is_valid(), "{} should be valid", fqn);
        assert!(Arc::ptr_eq(&projection, &project.get(&fqn)));

        let getter = format!("getV{}", expected);
        assert!(
            projection.declaration().methods.iter().any(|m| m.name == getter),
            "{} should declare {}",
            fqn,
            getter
        );

        let fields = project.session.get_augmented_members(&projection, MemberKind::Field);
        let mut names: Vec<&str> = fields.iter().map(|m| m.name.as_str()).collect();
        names.sort();
        let version_field = format!("v{}", expected);
        let mut wanted = vec!["value", version_field.as_str()];
        wanted.sort();
        assert_eq!(names, wanted, "{}", fqn);
        assert_eq!(
            fields.iter().find(|m| m.name == "value").unwrap().property_access(),
            Some(PropertyAccess::ReadWrite)
        );
    }
}
