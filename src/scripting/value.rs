//! Value bridge between host values and script-runtime values.
//!
//! Inbound (script → host, used when scripts hand arguments to the event
//! bus): each `Dynamic` is classified in priority order string → integer →
//! boolean → float. Values matching none of the four (maps, arrays, unit,
//! custom types) are dropped silently; a shorter argument sequence is not an
//! error.
//!
//! Outbound (script-function return): numbers convert to `i64` truncating,
//! strings are copied out, anything else collapses to integer 0. The loss is
//! intentional: event aggregation only understands integers, and a string
//! return only carries meaning for the authentication event.

use rhai::Dynamic;

/// One value carried host → script. Integer and float stay distinct; the
/// bridge never collapses them into a numeric union.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArgument {
    Int(i64),
    Float(f32),
    Bool(bool),
    Str(String),
}

/// Marshalled return of a script call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptValue {
    Int(i64),
    Str(String),
}

impl ScriptValue {
    /// Integer view; strings count as 0 for aggregation purposes.
    pub fn as_int(&self) -> i64 {
        match self {
            ScriptValue::Int(n) => *n,
            ScriptValue::Str(_) => 0,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            ScriptValue::Int(_) => None,
        }
    }
}

/// Classify one script value, or `None` when it matches no bridge type.
pub fn classify(value: &Dynamic) -> Option<ScriptArgument> {
    if value.is::<rhai::ImmutableString>() {
        value
            .clone()
            .into_string()
            .ok()
            .map(ScriptArgument::Str)
    } else if value.is::<i64>() {
        value.as_int().ok().map(ScriptArgument::Int)
    } else if value.is::<bool>() {
        value.as_bool().ok().map(ScriptArgument::Bool)
    } else if value.is::<f64>() {
        value.as_float().ok().map(|f| ScriptArgument::Float(f as f32))
    } else {
        None
    }
}

/// Classify a whole argument window, dropping unclassifiable positions.
pub fn classify_all(values: &[Dynamic]) -> Vec<ScriptArgument> {
    values.iter().filter_map(classify).collect()
}

pub fn to_dynamic(arg: &ScriptArgument) -> Dynamic {
    match arg {
        ScriptArgument::Int(n) => Dynamic::from(*n),
        ScriptArgument::Float(f) => Dynamic::from(f64::from(*f)),
        ScriptArgument::Bool(b) => Dynamic::from(*b),
        ScriptArgument::Str(s) => Dynamic::from(s.clone()),
    }
}

/// Apply the outbound marshalling policy to a raw script return.
pub fn marshal_return(value: Dynamic) -> ScriptValue {
    if value.is::<i64>() {
        ScriptValue::Int(value.as_int().unwrap_or(0))
    } else if value.is::<f64>() {
        ScriptValue::Int(value.as_float().map(|f| f as i64).unwrap_or(0))
    } else if value.is::<rhai::ImmutableString>() {
        match value.into_string() {
            Ok(s) => ScriptValue::Str(s),
            Err(_) => ScriptValue::Int(0),
        }
    } else {
        ScriptValue::Int(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_priority_keeps_numeric_strings() {
        let arg = classify(&Dynamic::from("5".to_string())).expect("classified");
        assert_eq!(arg, ScriptArgument::Str("5".to_string()));
    }

    #[test]
    fn integers_and_floats_stay_distinct() {
        assert_eq!(classify(&Dynamic::from(3_i64)), Some(ScriptArgument::Int(3)));
        assert_eq!(
            classify(&Dynamic::from(3.5_f64)),
            Some(ScriptArgument::Float(3.5))
        );
    }

    #[test]
    fn unclassifiable_values_drop_silently() {
        let values = vec![
            Dynamic::from(1_i64),
            Dynamic::UNIT,
            Dynamic::from(rhai::Map::new()),
            Dynamic::from(true),
        ];
        let args = classify_all(&values);
        assert_eq!(
            args,
            vec![ScriptArgument::Int(1), ScriptArgument::Bool(true)]
        );
    }

    #[test]
    fn empty_window_yields_empty_sequence() {
        assert!(classify_all(&[]).is_empty());
    }

    #[test]
    fn outbound_truncates_floats() {
        assert_eq!(marshal_return(Dynamic::from(7.9_f64)), ScriptValue::Int(7));
        assert_eq!(marshal_return(Dynamic::from(-2.9_f64)), ScriptValue::Int(-2));
    }

    #[test]
    fn outbound_defaults_to_zero() {
        assert_eq!(marshal_return(Dynamic::UNIT), ScriptValue::Int(0));
        assert_eq!(marshal_return(Dynamic::from(true)), ScriptValue::Int(0));
        assert_eq!(
            marshal_return(Dynamic::from("banned".to_string())),
            ScriptValue::Str("banned".to_string())
        );
    }

    #[test]
    fn round_trip_through_dynamic() {
        let args = vec![
            ScriptArgument::Int(42),
            ScriptArgument::Float(1.5),
            ScriptArgument::Bool(false),
            ScriptArgument::Str("alice".to_string()),
        ];
        let back = classify_all(&args.iter().map(to_dynamic).collect::<Vec<_>>());
        assert_eq!(back, args);
    }
}
