//! Line tokenizing shared by the DSC command stream and the parameter files.
//!
//! Both inputs are plain UTF-8 text, one command per line. Tokens are coerced
//! int-first, then float, then kept verbatim as text; an unparseable token is
//! never an error at this level.

/// One coerced token from an input line.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f32),
    Text(String),
}

impl Value {
    fn coerce(token: &str) -> Self {
        if let Ok(i) = token.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = token.parse::<f32>() {
            return Self::Float(f);
        }
        Self::Text(token.to_string())
    }

    #[inline(always)]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the token; ints widen to f32.
    #[inline(always)]
    pub const fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Int(i) => Some(*i as f32),
            Self::Float(f) => Some(*f),
            Self::Text(_) => None,
        }
    }
}

/// Parses one DSC stream line of the form `NAME(arg1, arg2, ...);`.
///
/// The trailing two characters are a statement terminator and are stripped
/// before splitting. A line with no opening parenthesis yields the trimmed
/// line as the command name with no args, so malformed input degrades to an
/// unrecognized command instead of an error.
pub fn parse_dsc_line(line: &str) -> (String, Vec<Value>) {
    // DSC dumps frequently come with Windows line endings.
    let line = line.strip_suffix('\r').unwrap_or(line);
    // `get` guards against a terminator split landing mid-codepoint.
    let body = line.get(..line.len().saturating_sub(2)).unwrap_or(line);
    let Some((name, args)) = body.split_once('(') else {
        return (line.trim().to_string(), Vec::new());
    };
    let args = args.split(", ").map(Value::coerce).collect();
    (name.to_string(), args)
}

/// Parses one parameter-file line: a command name followed by space-delimited
/// values. The command name comes back as `args[0]` (a `Text` unless the line
/// is degenerate), matching how the extractors index into it.
pub fn parse_param_line(line: &str) -> Vec<Value> {
    line.strip_suffix('\r')
        .unwrap_or(line)
        .trim_matches(' ')
        .split(' ')
        .map(Value::coerce)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Value, parse_dsc_line, parse_param_line};

    #[test]
    fn param_line_coerces_ints() {
        let args = parse_param_line("tone_map_method 1");
        assert_eq!(
            args,
            vec![Value::Text("tone_map_method".into()), Value::Int(1)],
            "second token should be integer-typed"
        );
    }

    #[test]
    fn param_line_coerces_floats_and_keeps_text() {
        let args = parse_param_line("fade_color 0.5 1 xyz");
        assert_eq!(args[1], Value::Float(0.5));
        assert_eq!(args[2], Value::Int(1));
        assert_eq!(args[3], Value::Text("xyz".into()));
    }

    #[test]
    fn dsc_line_strips_terminator_and_splits_args() {
        let (name, args) = parse_dsc_line("TIME(39600);");
        assert_eq!(name, "TIME");
        assert_eq!(args, vec![Value::Int(39600)]);
    }

    #[test]
    fn dsc_line_with_multiple_args() {
        let (name, args) = parse_dsc_line("MOUTH_ANIM(0, 24, 2.5);");
        assert_eq!(name, "MOUTH_ANIM");
        assert_eq!(
            args,
            vec![Value::Int(0), Value::Int(24), Value::Float(2.5)]
        );
    }

    #[test]
    fn dsc_line_without_parenthesis_degrades_to_bare_name() {
        let (name, args) = parse_dsc_line("PV_END");
        assert_eq!(name, "PV_END");
        assert!(args.is_empty());
    }

    #[test]
    fn windows_line_endings_are_invisible() {
        let (name, args) = parse_dsc_line("TIME(100);\r");
        assert_eq!(name, "TIME");
        assert_eq!(args, vec![Value::Int(100)]);
        assert_eq!(
            parse_param_line("gamma 1.0\r"),
            vec![Value::Text("gamma".into()), Value::Float(1.0)]
        );
    }

    #[test]
    fn int_widens_to_f32() {
        assert_eq!(Value::Int(4).as_f32(), Some(4.0));
        assert_eq!(Value::Text("x".into()).as_f32(), None);
    }
}
