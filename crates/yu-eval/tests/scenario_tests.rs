//! End-to-end scenarios: whole programs run through parser and interpreter
//! with host-registered natives and script modules.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use yu_eval::*;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

type Output = Arc<Mutex<Vec<String>>>;

fn printer(out: &Output) -> Arc<dyn NativeFunction> {
    let out = Arc::clone(out);
    Arc::new(NativeFn::new("print", Arity::Any, move |args, ctx, interp| {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(interp.eval_expression(arg, ctx)?.to_string());
        }
        out.lock().push(parts.join(","));
        Ok(())
    }))
}

fn interpreter(session: u64) -> (Interpreter, Output) {
    let out: Output = Arc::new(Mutex::new(Vec::new()));
    let mut interp = Interpreter::new(SessionId(session));
    interp.register_function(printer(&out)).unwrap();
    (interp, out)
}

fn run(interp: &Interpreter, source: &str) -> Context {
    let scope = match yu_parser::parse_source("scenario.yu", source) {
        Ok(scope) => scope,
        Err(e) => panic!("unexpected parse error: {e}"),
    };
    let mut ctx = interp.new_context();
    if let Err(e) = interp.eval_with(&scope, &mut ctx) {
        panic!("unexpected evaluation error: {e}");
    }
    ctx
}

fn wait_until(what: &str, done: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

const FIB_MODULE: &str = r#"
fn fib(i, *r)
    if(i <= 2) {
        s r = 1
    } else {
        s a = i - 1
        s b = i - 2
        math.fib(a, x)
        math.fib(b, y)
        s r = x + y
    }
end fn
"#;

fn math_module() -> Module {
    let scope = yu_parser::parse_source("math.yu", FIB_MODULE).unwrap();
    let mut module = Module::new("math");
    module.add_scope(&scope);
    module
}

// ─────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_loop_break_and_concatenation() {
    let (interp, out) = interpreter(2_001);
    let source = r#"
s a = 0
print(a, a, a)
for(1; 5) {
    s a = a + 1
    if(a > 3) { break }
    print("a = " + a)
}
"#;
    let ctx = run(&interp, source);
    assert_eq!(
        out.lock().clone(),
        vec!["0,0,0", "a = 1", "a = 2", "a = 3"]
    );
    assert_eq!(ctx.local("a"), Value::Int(4));
}

#[test]
fn test_recursive_module_function() {
    let (mut interp, _) = interpreter(2_002);
    interp.register_module(math_module()).unwrap();
    let ctx = run(&interp, "math.fib(20, result)");
    assert_eq!(ctx.local("result"), Value::Int(6765));
}

#[test]
fn test_module_call_through_fn_keyword() {
    let (mut interp, _) = interpreter(2_003);
    interp.register_module(math_module()).unwrap();
    let ctx = run(&interp, "fn math.fib(10, r)");
    assert_eq!(ctx.local("r"), Value::Int(55));
}

#[test]
fn test_module_program_reused_across_contexts() {
    let (mut interp, out) = interpreter(2_004);
    interp.register_module(math_module()).unwrap();
    let scope = yu_parser::parse_source("loop.yu", "for(1; 3) { math.fib(12, n)\nprint(n) }")
        .unwrap();
    for _ in 0..3 {
        interp.eval(&scope).unwrap();
    }
    assert_eq!(out.lock().len(), 9);
    assert!(out.lock().iter().all(|line| line == "144"));
}

#[test]
fn test_spawned_block_shares_session_not_locals() {
    let (mut interp, _) = interpreter(2_005);
    interp.register_function(Arc::new(SpawnFunction)).unwrap();
    let source = r#"
s seed = 5
spawn()
{
    s seed = seed * 2
    ss.spawned_result = seed
}
s after = seed
"#;
    let ctx = run(&interp, source);
    assert_eq!(ctx.local("after"), Value::Int(5));

    let store = session_store(SessionId(2_005));
    wait_until("spawned task", || store.contains("spawned_result"));
    assert_eq!(store.get("spawned_result"), Value::Int(10));
}

#[test]
fn test_task_handle_reports_completion() {
    let (interp, out) = interpreter(2_006);
    let scope = yu_parser::parse_source("task.yu", "{ print(\"from task\") }").unwrap();
    let yu_types::ast::Stmt::Block(block) = &scope.block.stmts[0] else {
        panic!("expected a block");
    };
    let ctx = interp.new_context();
    let handle = interp.spawn(Arc::clone(block), &ctx).unwrap();
    wait_until("task completion", || handle.is_finished());
    assert_eq!(out.lock().clone(), vec!["from task"]);

    let other = interp.spawn(Arc::clone(block), &ctx).unwrap();
    assert_ne!(other.id(), handle.id());
    wait_until("second task", || other.is_finished());
}

#[test]
fn test_failing_task_still_finishes() {
    let (interp, out) = interpreter(2_007);
    let scope = yu_parser::parse_source("task.yu", "{ missing() }").unwrap();
    let yu_types::ast::Stmt::Block(block) = &scope.block.stmts[0] else {
        panic!("expected a block");
    };
    let handle = interp.spawn(Arc::clone(block), &interp.new_context()).unwrap();
    wait_until("failing task", || handle.is_finished());
    assert!(out.lock().is_empty());
}

#[test]
fn test_registry_locked_while_task_holds_interpreter() {
    let (mut interp, _) = interpreter(2_008);
    let gate = Arc::new(Mutex::new(()));
    let guard = gate.lock();
    let waiter = Arc::clone(&gate);
    interp
        .register_function(Arc::new(NativeFn::new("wait", Arity::Exact(0), move |_, _, _| {
            drop(waiter.lock());
            Ok(())
        })))
        .unwrap();
    let scope = yu_parser::parse_source("task.yu", "{ wait() }").unwrap();
    let yu_types::ast::Stmt::Block(block) = &scope.block.stmts[0] else {
        panic!("expected a block");
    };
    let handle = interp.spawn(Arc::clone(block), &interp.new_context()).unwrap();
    assert!(matches!(
        interp.register_module(Module::new("late")),
        Err(EvalError::RegistryInUse)
    ));
    drop(guard);
    wait_until("blocked task", || handle.is_finished());

    // The task drops its interpreter clone right after reporting completion.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match interp.register_module(Module::new("late")) {
            Ok(()) => break,
            Err(EvalError::RegistryInUse) => {
                assert!(Instant::now() < deadline, "registry never released");
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(interp.registry().module_count(), 1);
}
