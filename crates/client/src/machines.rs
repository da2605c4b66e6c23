use serde_json::Value;

use crate::error::{Error, Result};

pub const THINGS_PATH: &str = "/things";

const COFFEE_MACHINE: &str = "CoffeeMachine";

/// Pick a serial number out of a `/things` listing.
///
/// The single `CoffeeMachine` wins; with no machine tagged, a listing of
/// exactly one thing is accepted as-is. Anything else is ambiguous.
pub fn select_serial_number(things: &Value) -> Result<String> {
    let things = things
        .as_array()
        .ok_or_else(|| Error::Machine("Unexpected response from /things endpoint.".into()))?;

    let machines: Vec<&Value> = things
        .iter()
        .filter(|thing| thing.get("type").and_then(Value::as_str) == Some(COFFEE_MACHINE))
        .collect();

    let candidate = match (machines.as_slice(), things.as_slice()) {
        ([machine], _) => Some(*machine),
        ([], [thing]) => Some(thing),
        _ => None,
    };

    candidate
        .and_then(|thing| thing.get("serialNumber"))
        .and_then(Value::as_str)
        .filter(|serial| !serial.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Machine(
                "Multiple machines found. Set LM_MACHINE_ID to the desired serial number.".into(),
            )
        })
}
