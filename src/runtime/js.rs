//! DW-011: In-process JavaScript evaluator backed by `boa_engine`.
//!
//! Each document gets its own `Context`; the global object is the
//! environment. Before any fragment runs the context is populated with:
//! - `print(...)` and `console.{log,info,warn,error}(...)` writing to the capture buffer
//! - `plt`, a headless display stand-in whose `show()` never blocks
//! - `writeFile(path, text)` for text artifacts relative to the working directory

use crate::core::capture;
use crate::core::error::{WeaveError, WeaveResult};
use crate::runtime::Evaluator;
use boa_engine::object::{FunctionObjectBuilder, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsNativeError, JsResult, JsString, JsValue, NativeFunction, Source,
};
use regex::Regex;
use std::sync::OnceLock;

type HostFn = fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>;

/// JavaScript evaluator configuration.
#[derive(Debug, Clone, Default)]
pub struct JsEvaluator {
    /// Loop iteration budget per context (unbounded when `None`)
    pub loop_limit: Option<u64>,
}

/// One document's JavaScript environment.
pub struct JsEnvironment {
    context: Context,
}

impl JsEvaluator {
    pub fn new(loop_limit: Option<u64>) -> Self {
        Self { loop_limit }
    }
}

impl Evaluator for JsEvaluator {
    type Environment = JsEnvironment;

    fn environment(&self) -> WeaveResult<JsEnvironment> {
        let mut context = Context::default();
        if let Some(limit) = self.loop_limit {
            context.runtime_limits_mut().set_loop_iteration_limit(limit);
        }
        register_host(&mut context)
            .map_err(|e| WeaveError::Runtime(format!("failed to register host functions: {}", e)))?;
        tracing::debug!(loop_limit = ?self.loop_limit, "created javascript environment");
        Ok(JsEnvironment { context })
    }

    fn execute(&self, env: &mut JsEnvironment, source: &str) -> Result<(), String> {
        let outcome = env.context.eval(Source::from_bytes(source));
        env.context.run_jobs();
        match outcome {
            Ok(_) => Ok(()),
            Err(err) => Err(match err.try_native(&mut env.context) {
                Ok(native) => native.to_string(),
                Err(_) => err.to_string(),
            }),
        }
    }
    /// Boa reports parse positions as `at line L, col C`, relative to the fragment.
    fn fault_position(&self, description: &str) -> Option<(usize, usize)> {
        let caps = position_pattern().captures(description)?;
        let line = caps.get(1)?.as_str().parse().ok()?;
        let column = caps.get(2)?.as_str().parse().ok()?;
        Some((line, column))
    }
}

fn position_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"line (\d+), col(?:umn)? (\d+)").expect("position pattern is valid"))
}

fn register_host(context: &mut Context) -> JsResult<()> {
    register_global_fn(context, "print", 0, host_print)?;
    register_global_fn(context, "writeFile", 2, host_write_file)?;
    register_console(context)?;
    register_plt(context)?;
    Ok(())
}

fn register_global_fn(context: &mut Context, name: &str, length: usize, body: HostFn) -> JsResult<()> {
    let function = FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(body))
        .name(JsString::from(name))
        .length(length)
        .constructor(false)
        .build();
    context.register_global_property(
        JsString::from(name),
        function,
        Attribute::WRITABLE | Attribute::CONFIGURABLE,
    )?;
    Ok(())
}

fn register_console(context: &mut Context) -> JsResult<()> {
    let mut initializer = ObjectInitializer::new(context);
    initializer
        .function(NativeFunction::from_fn_ptr(host_print), js_string!("log"), 0)
        .function(NativeFunction::from_fn_ptr(host_print), js_string!("info"), 0)
        .function(NativeFunction::from_fn_ptr(host_print), js_string!("warn"), 0)
        .function(NativeFunction::from_fn_ptr(host_print), js_string!("error"), 0);
    let console = initializer.build();
    context.register_global_property(js_string!("console"), console, Attribute::all())?;
    Ok(())
}

/// Display calls return immediately; image content comes from external renderers.
fn register_plt(context: &mut Context) -> JsResult<()> {
    let mut initializer = ObjectInitializer::new(context);
    initializer
        .function(NativeFunction::from_fn_ptr(host_noop), js_string!("show"), 0)
        .function(NativeFunction::from_fn_ptr(host_noop), js_string!("figure"), 0)
        .function(NativeFunction::from_fn_ptr(host_noop), js_string!("close"), 0)
        .function(NativeFunction::from_fn_ptr(host_noop), js_string!("savefig"), 1);
    let plt = initializer.build();
    context.register_global_property(js_string!("plt"), plt, Attribute::all())?;
    Ok(())
}

fn host_noop(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::undefined())
}

fn host_print(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(display_value(arg, ctx)?);
    }
    capture::emit_line(&parts.join(" "));
    Ok(JsValue::undefined())
}

fn host_write_file(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let path = args
        .first()
        .and_then(JsValue::as_string)
        .map(JsString::to_std_string_escaped)
        .ok_or_else(|| JsNativeError::typ().with_message("writeFile: path must be a string"))?;
    let text = match args.get(1) {
        Some(value) => display_value(value, ctx)?,
        None => String::new(),
    };
    std::fs::write(&path, text)
        .map_err(|e| JsNativeError::error().with_message(format!("writeFile {}: {}", path, e)))?;
    Ok(JsValue::undefined())
}

/// Plain objects and arrays print as JSON, everything else as `String(value)`.
fn display_value(value: &JsValue, ctx: &mut Context) -> JsResult<String> {
    if let Some(object) = value.as_object() {
        if !object.is_callable() {
            if let Ok(json) = value.to_json(ctx) {
                return Ok(json.to_string());
            }
        }
    }
    Ok(value.to_string(ctx)?.to_std_string_escaped())
}
