/// Embedded Lua script execution
///
/// The chunk sees three globals: `inputs` (live predecessor outputs keyed by
/// node id), `vars` (run variables) and `payload`, plus `now()` / `time()`
/// helpers. Its return value becomes the node output. Scripts are
/// deterministic, so any Lua error is a configuration error.
///
/// The VM stops at its next instruction check once the handler future is
/// dropped, which is what the engine's node timeout does.

use crate::runtime::context::HandlerContext;
use crate::runtime::error::NodeError;
use crate::runtime::handler::NodeHandler;
use crate::workflow::types::{Node, NodeConfig};
use async_trait::async_trait;
use mlua::LuaSerdeExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const MEMORY_LIMIT_BYTES: usize = 64 * 1024 * 1024;
const INTERRUPT_CHECK_INSTRUCTIONS: u32 = 1_000;

/// Raises the interrupt flag when the awaiting future goes away
struct InterruptOnDrop(Arc<AtomicBool>);

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

pub struct ScriptHandler;

#[async_trait]
impl NodeHandler for ScriptHandler {
    async fn execute(&self, node: &Node, ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError> {
        let NodeConfig::Script(config) = &node.config else {
            return Err(NodeError::config(format!("Node '{}' is not a script node", node.id)));
        };

        let globals = json!({
            "inputs": ctx.inputs(),
            "vars": ctx.variables(),
            "payload": ctx.payload(),
        });
        let source = config.source.clone();
        let chunk_name = node.id.clone();

        tracing::debug!("🧠 Executing Lua script for node '{}'", node.id);

        let interrupted = Arc::new(AtomicBool::new(false));
        let _interrupt = InterruptOnDrop(interrupted.clone());

        tokio::task::spawn_blocking(move || {
            run_lua(&chunk_name, &source, globals, interrupted).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| NodeError::transient(format!("Script task failed: {}", e)))?
        .map_err(|e| NodeError::config(format!("Lua script failed in node '{}': {}", node.id, e)))
    }
}

fn run_lua(chunk_name: &str, source: &str, globals: Value, interrupted: Arc<AtomicBool>) -> mlua::Result<Value> {
    let lua = mlua::Lua::new();
    lua.set_memory_limit(MEMORY_LIMIT_BYTES)?;
    lua.set_hook(
        mlua::HookTriggers::new().every_nth_instruction(INTERRUPT_CHECK_INSTRUCTIONS),
        move |_, _| {
            if interrupted.load(Ordering::Relaxed) {
                Err(mlua::Error::runtime("script interrupted: node timed out or run was abandoned"))
            } else {
                Ok(mlua::VmState::Continue)
            }
        },
    )?;

    let table = lua.globals();
    for name in ["os", "io", "debug", "package", "require", "dofile", "loadfile"] {
        table.set(name, mlua::Nil)?;
    }

    table.set("now", lua.create_function(|_, ()| Ok(chrono::Utc::now().to_rfc3339()))?)?;
    table.set("time", lua.create_function(|_, ()| Ok(chrono::Utc::now().timestamp()))?)?;

    if let Value::Object(map) = globals {
        for (name, value) in map {
            table.set(name, lua.to_value(&value)?)?;
        }
    }

    let result: mlua::Value = lua.load(source).set_name(chunk_name).eval()?;
    lua.from_value(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::context::{NodeOutput, RunContext};
    use crate::workflow::types::ScriptConfig;
    use std::collections::HashSet;
    use std::time::Duration;

    fn script(source: &str) -> Node {
        Node::new("calc", NodeConfig::Script(ScriptConfig { source: source.to_string() }))
    }

    #[tokio::test]
    async fn test_script_reads_inputs_and_vars() {
        let mut run = RunContext::new();
        run.record_output("order", NodeOutput::success(json!({ "qty": 3, "price": 2.5 }), 1));
        run.set_variable("discount", json!(1.5));
        let payload = Value::Null;
        let mut ctx = HandlerContext::new(&mut run, "r", &payload, vec!["order".into()], HashSet::new());

        let node = script("return { total = inputs.order.qty * inputs.order.price - vars.discount }");
        let output = ScriptHandler.execute(&node, &mut ctx).await.unwrap();
        assert_eq!(output["total"].as_f64(), Some(6.0));
    }

    #[tokio::test]
    async fn test_sandbox_blocks_os() {
        let mut run = RunContext::new();
        let payload = Value::Null;
        let mut ctx = HandlerContext::new(&mut run, "r", &payload, vec![], HashSet::new());

        let err = ScriptHandler.execute(&script("return os.getenv('HOME')"), &mut ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[tokio::test]
    async fn test_syntax_error_is_config_error() {
        let mut run = RunContext::new();
        let payload = Value::Null;
        let mut ctx = HandlerContext::new(&mut run, "r", &payload, vec![], HashSet::new());

        let err = ScriptHandler.execute(&script("return {"), &mut ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn test_interrupt_stops_runaway_script() {
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = interrupted.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(run_lua("spin", "while true do end", Value::Null, flag).map_err(|e| e.to_string()));
        });

        std::thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err(), "loop should still be spinning");

        interrupted.store(true, Ordering::Relaxed);
        let result = rx.recv_timeout(Duration::from_secs(5)).expect("VM kept running after interrupt");
        assert!(result.unwrap_err().contains("interrupted"));
    }

    #[tokio::test]
    async fn test_timed_out_execute_stops_the_vm() {
        let mut run = RunContext::new();
        let payload = Value::Null;
        let mut ctx = HandlerContext::new(&mut run, "r", &payload, vec![], HashSet::new());

        let node = script("while true do end");
        let timed_out = tokio::time::timeout(Duration::from_millis(50), ScriptHandler.execute(&node, &mut ctx)).await;
        assert!(timed_out.is_err());
        // Runtime shutdown waits for the blocking Lua task, so a VM that kept spinning would hang here
    }
}
