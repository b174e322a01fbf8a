mod rupiah;

pub mod op;
mod secret;

pub use rupiah::{Rupiah, RupiahConversionError, IDR_CURRENCY_CODE, IDR_CURRENCY_CODE_LOWER};
pub use secret::Secret;

/// Interprets an environment-variable style boolean flag. Accepts the usual spellings in any case
/// (`1`/`true`/`yes`/`on` and their negations); a missing or unrecognised value falls back to `default` rather
/// than erroring, since these flags mostly gate optional behavior.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
