mod common;

use bridge_ts::BridgeError;
use bridge_ts::ContextOptions;
use bridge_ts::LifecycleError;
use common::declaration;
use common::with_program;

#[test]
fn close_releases_every_handle() {
  with_program(&[("main.ts", "let x: Point;")], |cx| {
    let top_level = cx.retained_handles();
    let decl = declaration(cx, "x");
    let ty = cx.checker().type_at_location(&decl).unwrap();
    let properties = ty.object_type().unwrap().properties().unwrap();
    assert!(cx.retained_handles() > top_level);
    assert_eq!(cx.cache_sizes().symbols, properties.len());

    cx.close().unwrap();
    assert_eq!(cx.retained_handles(), 0);
    assert_eq!(cx.cache_sizes(), Default::default());

    for err in [
      decl.pos().unwrap_err(),
      ty.type_string().unwrap_err(),
      properties[0].name().unwrap_err(),
    ] {
      assert!(
        matches!(err.root(), BridgeError::Lifecycle(LifecycleError::UseAfterClose { .. })),
        "{err}"
      );
    }
  });
}

#[test]
fn closing_twice_is_rejected() {
  with_program(&[("main.ts", "")], |cx| {
    cx.close().unwrap();
    let err = cx.close().unwrap_err();
    assert!(matches!(
      err,
      BridgeError::Lifecycle(LifecycleError::ClosedTwice { .. })
    ));
    assert!(cx.source_files().unwrap_err().is_lifecycle());
  });
}

#[test]
fn node_lists_retain_per_conversion() {
  with_program(&[("main.ts", "let a = 1, b = 2;")], |cx| {
    let list = declaration(cx, "a").parent().unwrap().unwrap();
    let before = cx.retained_handles();
    let first = list.child_list("declarations").unwrap().unwrap();
    let second = list.child_list("declarations").unwrap().unwrap();
    assert_eq!(cx.retained_handles(), before + 2);
    // Elements still resolve to the shared node proxies.
    assert_eq!(first.get(1).unwrap().unwrap(), second.get(1).unwrap().unwrap());
    assert_eq!(first.to_vec().unwrap().len(), 2);

    let clone = first.clone();
    drop(first);
    assert_eq!(cx.retained_handles(), before + 2);
    drop(clone);
    drop(second);
    assert_eq!(cx.retained_handles(), before);
  });
}

#[test]
fn walking_lists_repeatedly_does_not_grow_the_session() {
  with_program(&[("main.ts", "let a = 1, b = 2;")], |cx| {
    let list = declaration(cx, "a").parent().unwrap().unwrap();
    let before = cx.retained_handles();
    for _ in 0..1000 {
      let declarations = list.child_list("declarations").unwrap().unwrap();
      assert_eq!(declarations.len(), 2);
    }
    assert_eq!(cx.retained_handles(), before);
  });
}

#[test]
fn lists_outliving_close_release_nothing() {
  with_program(&[("main.ts", "let a = 1;")], |cx| {
    let list = declaration(cx, "a")
      .parent()
      .unwrap()
      .unwrap()
      .child_list("declarations")
      .unwrap()
      .unwrap();
    cx.close().unwrap();
    assert!(list.pos().unwrap_err().is_lifecycle());
    drop(list);
    assert_eq!(cx.retained_handles(), 0);
  });
}

#[test]
fn foreign_exceptions_name_the_call() {
  with_program(&[("main.ts", "")], |cx| {
    let program = cx.program().unwrap();
    let err = cx.invoke(&program, "emit", Vec::new()).unwrap_err();
    assert!(err.to_string().starts_with("`emit`: foreign call failed"), "{err}");
    assert!(err.to_string().contains("emit is not supported"), "{err}");

    let err = cx.invoke(&program, "missing", Vec::new()).unwrap_err();
    assert!(matches!(err.root(), BridgeError::ShapeMismatch { .. }), "{err}");
  });
}

fn refusal() -> BridgeError {
  BridgeError::KindMismatch {
    expected: "Identifier",
    actual: "NumericLiteral".into(),
  }
}

#[test]
fn host_errors_cross_foreign_frames_unchanged() {
  with_program(&[("main.ts", "")], |cx| {
    let visitor: rquickjs::Object = cx
      .ctx()
      .eval("({ visit(f) { return f(1) + 1; }, guarded(f) { try { f(); } catch (e) { return e.message; } } })")
      .unwrap();
    let refuse = || cx.host_function(|_cx, _args| Err(refusal())).unwrap().into_value();

    let err = cx.invoke(&visitor, "visit", vec![refuse()]).unwrap_err();
    assert_eq!(
      err.to_string(),
      "`visit`: kind mismatch: expected Identifier, found NumericLiteral"
    );

    // The foreign side sees an ordinary exception it may handle itself.
    let message = cx
      .call(&visitor, "guarded", vec![refuse()], &bridge_ts::convert::STRING)
      .unwrap();
    assert!(message.contains("expected Identifier"), "{message}");

    // A recovered host error is not blamed for the next unrelated failure.
    let program = cx.program().unwrap();
    let err = cx.invoke(&program, "emit", Vec::new()).unwrap_err();
    assert!(matches!(err.root(), BridgeError::Foreign { .. }), "{err}");
  });
}

#[test]
fn contexts_are_independent() {
  let runtime = common::runtime();
  runtime.with(|ctx| {
    let a = common::open(ctx.clone(), &[("a.ts", "let x = 1;")], ContextOptions::default()).unwrap();
    let b = common::open(ctx, &[("b.ts", "let x = 1;")], ContextOptions::default()).unwrap();
    assert!(!a.ptr_eq(&b));
    let xa = declaration(&a, "x");
    a.close().unwrap();
    assert!(xa.pos().is_err());
    assert_eq!(declaration(&b, "x").pos().unwrap(), 3);
    b.close().unwrap();
  });
}
