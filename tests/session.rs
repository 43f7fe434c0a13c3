// End-to-end behavior of the module registry through a pad session:
// incremental builds, package synthesis, listing, show lookup, exposure.

use solvrapad::interpreter::{Namespace, Value};
use solvrapad::session::{CellOutcome, CommandError, PadSession};

fn build(session: &mut PadSession, tokens: &[&str], cell: &str) -> String {
    match session.build(tokens, cell).expect("build should succeed") {
        CellOutcome::Built { full_name } => full_name,
        other => panic!("expected Built, found {other:?}"),
    }
}

#[test]
fn rebuild_appends_source_and_keeps_namespace_identity() {
    let mut session = PadSession::new(false);
    build(&mut session, &["a"], "x = 1\n");
    let before = session.table().lookup("a").expect("registered");

    build(&mut session, &["a"], "x += 1\n");
    let after = session.table().lookup("a").expect("still registered");

    assert!(Namespace::ptr_eq(&before, &after));
    assert_eq!(after.get("x"), Some(Value::Int(2)));
    let record = session.store().find("a").expect("record");
    assert_eq!(record.source, "x = 1\nx += 1\n");
}

#[test]
fn earlier_cell_definitions_stay_visible() {
    let mut session = PadSession::new(false);
    build(&mut session, &["calc"], "base = 10\n");
    build(&mut session, &["calc"], "fn shifted(n) { return base + n }\n");
    build(&mut session, &["calc"], "result = shifted(5)\n");
    let ns = session.table().lookup("calc").unwrap();
    assert_eq!(ns.get("result"), Some(Value::Int(15)));
}

#[test]
fn parented_build_synthesizes_and_links_ancestors() {
    let mut session = PadSession::new(false);
    let full = build(&mut session, &["sub", "in", "pkg"], "y = 5\n");
    assert_eq!(full, "pkg.sub");

    let table = session.table();
    let pkg = table.lookup("pkg").expect("synthetic parent");
    let sub = table.lookup("pkg.sub").expect("leaf module");
    match pkg.get("sub") {
        Some(Value::Module(ns)) => assert!(Namespace::ptr_eq(&ns, &sub)),
        other => panic!("expected module attribute, found {other:?}"),
    }
    assert_eq!(sub.get("y"), Some(Value::Int(5)));
}

#[test]
fn deep_chain_links_every_level() {
    let mut session = PadSession::new(false);
    build(&mut session, &["c", "in", "a.b"], "z = 3\n");

    let table = session.table();
    let a = table.lookup("a").unwrap();
    let ab = table.lookup("a.b").unwrap();
    let abc = table.lookup("a.b.c").unwrap();
    match a.get("b") {
        Some(Value::Module(ns)) => assert!(Namespace::ptr_eq(&ns, &ab)),
        other => panic!("expected module attribute, found {other:?}"),
    }
    match ab.get("c") {
        Some(Value::Module(ns)) => assert!(Namespace::ptr_eq(&ns, &abc)),
        other => panic!("expected module attribute, found {other:?}"),
    }
}

#[test]
fn building_leaf_does_not_clobber_existing_parent_module() {
    let mut session = PadSession::new(false);
    build(&mut session, &["pkg"], "marker = 1\n");
    let parent_before = session.table().lookup("pkg").unwrap();

    build(&mut session, &["sub", "in", "pkg"], "y = 2\n");
    let parent_after = session.table().lookup("pkg").unwrap();

    assert!(Namespace::ptr_eq(&parent_before, &parent_after));
    assert_eq!(parent_after.get("marker"), Some(Value::Int(1)));
    assert!(matches!(parent_after.get("sub"), Some(Value::Module(_))));
}

#[test]
fn list_preserves_first_build_order_across_rebuilds() {
    let mut session = PadSession::new(false);
    build(&mut session, &["beta"], "b = 1\n");
    build(&mut session, &["alpha"], "a = 1\n");
    build(&mut session, &["beta"], "b += 1\n");

    match session.feed("mod list").unwrap() {
        CellOutcome::Listing(names) => {
            assert_eq!(names, vec!["beta".to_string(), "alpha".to_string()]);
        }
        other => panic!("expected listing, found {other:?}"),
    }
}

#[test]
fn show_by_full_name_and_leaf_render_identically() {
    let mut session = PadSession::new(false);
    build(&mut session, &["util", "in", "pkg"], "x = 1\n");

    let by_full = session.feed("mod show pkg.util").unwrap();
    let by_leaf = session.feed("mod show util").unwrap();
    assert_eq!(by_full, by_leaf);
    match by_full {
        CellOutcome::Rendered(text) => {
            assert!(text.contains("mod build util in pkg"));
            assert!(text.contains("x = 1"));
        }
        other => panic!("expected rendered source, found {other:?}"),
    }
}

#[test]
fn show_duplicate_leaf_resolves_to_first_registered() {
    let mut session = PadSession::new(false);
    build(&mut session, &["util", "in", "pkg"], "which = 1\n");
    build(&mut session, &["util", "in", "other"], "which = 2\n");

    match session.feed("mod show util").unwrap() {
        CellOutcome::Rendered(text) => assert!(text.contains("in pkg")),
        other => panic!("expected rendered source, found {other:?}"),
    }
}

#[test]
fn show_unknown_module_reports_not_found() {
    let mut session = PadSession::new(false);
    match session.feed("mod show ghost").unwrap() {
        CellOutcome::Diagnostic(CommandError::NotFound(name)) => assert_eq!(name, "ghost"),
        other => panic!("expected not-found diagnostic, found {other:?}"),
    }
}

#[test]
fn malformed_build_changes_no_state() {
    let mut session = PadSession::new(false);
    let outcome = session.build(&["a", "b"], "x = 1\n").unwrap();
    assert_eq!(
        outcome,
        CellOutcome::Diagnostic(CommandError::BuildUsage)
    );
    assert!(session.store().is_empty());
    assert!(session.table().is_empty());
}

#[test]
fn build_exposes_leaf_and_top_level_in_shell() {
    let mut session = PadSession::new(false);
    build(&mut session, &["sub", "in", "pkg"], "y = 5\n");

    let shell = session.shell();
    assert!(matches!(shell.get("sub"), Some(Value::Module(_))));
    assert!(matches!(shell.get("pkg"), Some(Value::Module(_))));

    match session.feed("sub.y").unwrap() {
        CellOutcome::Value(Value::Int(5)) => {}
        other => panic!("expected 5, found {other:?}"),
    }
    match session.feed("pkg.sub.y").unwrap() {
        CellOutcome::Value(Value::Int(5)) => {}
        other => panic!("expected 5, found {other:?}"),
    }
}

#[test]
fn built_modules_are_importable_from_later_cells() {
    let mut session = PadSession::new(false);
    build(&mut session, &["sub", "in", "pkg"], "y = 7\n");

    let outcome = session.eval("import pkg.sub\npkg.sub.y").unwrap();
    assert_eq!(outcome, CellOutcome::Value(Value::Int(7)));
}

#[test]
fn interactive_cell_protocol_buffers_until_mod_end() {
    let mut session = PadSession::new(false);
    assert_eq!(session.feed("mod build demo").unwrap(), CellOutcome::Pending);
    assert!(session.in_cell());
    assert_eq!(session.feed("x = 41").unwrap(), CellOutcome::Pending);
    assert_eq!(session.feed("x += 1").unwrap(), CellOutcome::Pending);
    match session.feed("mod end").unwrap() {
        CellOutcome::Built { full_name } => assert_eq!(full_name, "demo"),
        other => panic!("expected Built, found {other:?}"),
    }
    assert!(!session.in_cell());
    assert_eq!(
        session.feed("demo.x").unwrap(),
        CellOutcome::Value(Value::Int(42))
    );
}

#[test]
fn malformed_interactive_build_prints_usage_immediately() {
    let mut session = PadSession::new(false);
    match session.feed("mod build two words").unwrap() {
        CellOutcome::Diagnostic(CommandError::BuildUsage) => {}
        other => panic!("expected usage diagnostic, found {other:?}"),
    }
    assert!(!session.in_cell());
    assert!(session.store().is_empty());
}

#[test]
fn stray_mod_end_is_diagnosed() {
    let mut session = PadSession::new(false);
    match session.feed("mod end").unwrap() {
        CellOutcome::Diagnostic(CommandError::StrayEnd) => {}
        other => panic!("expected stray-end diagnostic, found {other:?}"),
    }
}

#[test]
fn unknown_mod_command_prints_usage() {
    let mut session = PadSession::new(false);
    match session.feed("mod frobnicate").unwrap() {
        CellOutcome::Diagnostic(CommandError::Usage) => {}
        other => panic!("expected usage diagnostic, found {other:?}"),
    }
}

#[test]
fn failing_rebuild_keeps_appended_source_without_rollback() {
    let mut session = PadSession::new(false);
    build(&mut session, &["m"], "x = 1\n");
    let ns_before = session.table().lookup("m").unwrap();

    let err = session
        .build(&["m"], "x = missing_var\n")
        .expect_err("runtime error should surface");
    assert_eq!(err.code_str(), "E004");

    // Source is already appended; the namespace keeps its prior state.
    let record = session.store().find("m").unwrap();
    assert_eq!(record.source, "x = 1\nx = missing_var\n");
    let ns_after = session.table().lookup("m").unwrap();
    assert!(Namespace::ptr_eq(&ns_before, &ns_after));
    assert_eq!(ns_after.get("x"), Some(Value::Int(1)));
}

#[test]
fn failing_first_build_registers_nothing() {
    let mut session = PadSession::new(false);
    let err = session
        .build(&["ghost"], "definitely_missing\n")
        .expect_err("runtime error should surface");
    assert_eq!(err.code_str(), "E004");
    assert!(session.store().find("ghost").is_none());
    assert!(!session.table().contains("ghost"));
}

#[test]
fn rebuild_regenerates_build_line_to_latest_form() {
    let mut session = PadSession::new(false);
    build(&mut session, &["pkg.sub"], "a = 1\n");
    assert_eq!(
        session.store().find("pkg.sub").unwrap().build_line,
        "mod build pkg.sub"
    );

    build(&mut session, &["sub", "in", "pkg"], "b = 2\n");
    assert_eq!(
        session.store().find("pkg.sub").unwrap().build_line,
        "mod build sub in pkg"
    );
}

#[test]
fn shell_fragments_use_builtins_and_echo_expressions() {
    let mut session = PadSession::new(false);
    assert_eq!(session.feed("x = 2").unwrap(), CellOutcome::Quiet);
    assert_eq!(
        session.feed("len(\"four\") + x").unwrap(),
        CellOutcome::Value(Value::Int(6))
    );
}

#[test]
fn syntax_error_in_shell_fragment_uses_e001() {
    let mut session = PadSession::new(false);
    let err = session.feed("fn broken(").expect_err("syntax error");
    assert_eq!(err.code_str(), "E001");
}
