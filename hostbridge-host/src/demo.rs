//! Example command set used by the CLI and the integration tests.

use std::time::Duration;

use hostbridge_core::Value;

use crate::dispatcher::Dispatcher;

pub const SLOW_OPERATION_DELAY: Duration = Duration::from_millis(500);

pub fn dispatcher() -> Dispatcher {
    dispatcher_with_delay(SLOW_OPERATION_DELAY)
}

/// Same commands, with a custom delay for `slow_operation`.
pub fn dispatcher_with_delay(delay: Duration) -> Dispatcher {
    let mut d = Dispatcher::new();

    // Echo: returns exactly what was sent, so it serves text and structured calls alike
    d.register("echo", |payload: &str| {
        log::info!("[echo] {payload}");
        Ok(payload.to_owned())
    });

    d.register_json("greet", |payload| {
        let name = payload.as_str().unwrap_or("anonymous");
        log::info!("[greet] {name}");
        Ok(Value::from(format!("Hello, {name}!")))
    });

    d.register_json("divide", |payload| {
        let (a, b) = operands(&payload)?;
        if b == 0.0 {
            return Err("Division by zero".into());
        }
        Ok(Value::from(a / b))
    });

    d.register_json("add", |payload| {
        let (a, b) = operands(&payload)?;
        Ok(Value::from(a + b))
    });

    d.register_json("sub", |payload| {
        let (a, b) = operands(&payload)?;
        Ok(Value::from(a - b))
    });

    d.register_json("fs.read", |payload| {
        let file = payload.as_str().unwrap_or("");
        log::info!("[fs.read] {file}");
        match file {
            "config.json" => Ok(Value::object([
                ("name", Value::from("MyApp")),
                ("version", Value::from("1.0.0")),
            ])),
            "data.txt" => Ok(Value::from("Sample file contents")),
            _ => Err(format!("File not found: {file}")),
        }
    });

    d.register_json("slow_operation", move |payload| {
        log::info!("[slow_operation] starting...");
        std::thread::sleep(delay);
        Ok(Value::object([("status", Value::from("done")), ("input", payload)]))
    });

    d.register_json("types", |payload| {
        Ok(Value::object([
            ("is_object", Value::from(matches!(payload, Value::Object(_)))),
            ("is_array", Value::from(matches!(payload, Value::Array(_)))),
            ("is_string", Value::from(matches!(payload, Value::String(_)))),
            ("is_number", Value::from(matches!(payload, Value::Number(_)))),
            ("is_bool", Value::from(matches!(payload, Value::Bool(_)))),
            ("is_null", Value::from(payload.is_null())),
        ]))
    });

    // Fire-and-forget; the answer carries no meaning
    d.register_json("log", |payload| {
        let msg = payload.get("msg").and_then(Value::as_str).unwrap_or("");
        log::info!("[log] {msg}");
        Ok(Value::Null)
    });

    d
}

fn operands(payload: &Value) -> Result<(f64, f64), String> {
    let a = payload
        .get("a")
        .and_then(Value::as_f64)
        .ok_or("Missing or invalid 'a'")?;
    let b = payload
        .get("b")
        .and_then(Value::as_f64)
        .ok_or("Missing or invalid 'b'")?;
    Ok((a, b))
}
