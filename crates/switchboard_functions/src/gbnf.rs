//! JSON schema to GBNF grammar conversion.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use switchboard_error::{GrammarError, GrammarErrorKind};
use switchboard_interface::GrammarCompiler;
use tracing::{debug, instrument};

/// Grammar accepting any JSON object, installed for `json_object` replies.
pub const JSON_BNF: &str = r#"root   ::= object
value  ::= object | array | string | number | ("true" | "false" | "null") ws

object ::=
  "{" ws (
            string ":" ws value
    ("," ws string ":" ws value)*
  )? "}" ws

array  ::=
  "[" ws (
            value
    ("," ws value)*
  )? "]" ws

string ::=
  "\"" (
    [^"\\] |
    "\\" (["\\/bfnrt] | "u" [0-9a-fA-F] [0-9a-fA-F] [0-9a-fA-F] [0-9a-fA-F]) # escapes
  )* "\"" ws

number ::= ("-"? ([0-9] | [1-9] [0-9]*)) ("." [0-9]+)? ([eE] [-+]? [0-9]+)? ws

ws ::= ([ \t\n] ws)?"#;

const ROOT: &str = "root";

/// Body and dependencies of the built-in rules.
fn primitive(name: &str) -> Option<(&'static str, &'static [&'static str])> {
    let rule: (&'static str, &'static [&'static str]) = match name {
        "space" => (r#"" "?"#, &[]),
        "boolean" => (r#"("true" | "false") space"#, &["space"]),
        "null" => (r#""null" space"#, &["space"]),
        "integer" => (r#"("-"? ([0-9] | [1-9] [0-9]*)) space"#, &["space"]),
        "number" => (
            r#"("-"? ([0-9] | [1-9] [0-9]*)) ("." [0-9]+)? ([eE] [-+]? [0-9]+)? space"#,
            &["space"],
        ),
        "string" => (
            r#""\"" ( [^"\\] | "\\" (["\\/bfnrt] | "u" [0-9a-fA-F] [0-9a-fA-F] [0-9a-fA-F] [0-9a-fA-F]) )* "\"" space"#,
            &["space"],
        ),
        "value" => (
            "object | array | string | number | boolean | null",
            &["object", "array", "string", "number", "boolean", "null"],
        ),
        "object" => (
            r#""{" space ( string ":" space value ("," space string ":" space value)* )? "}" space"#,
            &["space", "string", "value"],
        ),
        "array" => (
            r#""[" space ( value ("," space value)* )? "]" space"#,
            &["space", "value"],
        ),
        _ => return None,
    };
    Some(rule)
}

/// Compiles JSON schemas into GBNF grammars for llama.cpp-style backends.
///
/// Supports `oneOf`/`anyOf`, `const`, `enum`, objects with `properties`,
/// arrays with `items` and the scalar types. Object properties are emitted
/// in `prop_order` first, then by name.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use switchboard_functions::GbnfCompiler;
/// use switchboard_interface::GrammarCompiler;
///
/// let grammar = GbnfCompiler::new()
///     .compile(&json!({"type": "object", "properties": {"city": {"type": "string"}}}))
///     .unwrap();
///
/// assert!(grammar.starts_with("root ::= "));
/// assert!(grammar.contains(r#""\"city\"""#));
/// ```
#[derive(Debug, Clone, Default)]
pub struct GbnfCompiler {
    prop_order: Vec<String>,
}

impl GbnfCompiler {
    /// Compiler with name-ordered properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiler tuned for function calls: `function` before `arguments`.
    pub fn for_function_calls() -> Self {
        Self::new().with_prop_order(["function", "arguments"])
    }

    /// Emits these properties first, in this order.
    pub fn with_prop_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prop_order = order.into_iter().map(Into::into).collect();
        self
    }
}

impl GrammarCompiler for GbnfCompiler {
    #[instrument(skip_all)]
    fn compile(&self, schema: &Value) -> Result<String, GrammarError> {
        let mut converter = Converter {
            prop_order: &self.prop_order,
            rules: BTreeMap::new(),
        };
        converter.visit(schema, ROOT, "#")?;
        let grammar = converter.format();
        debug!(rule_count = converter.rules.len(), "Grammar compiled");
        Ok(grammar)
    }
}

struct Converter<'a> {
    prop_order: &'a [String],
    rules: BTreeMap<String, String>,
}

impl Converter<'_> {
    fn add_rule(&mut self, name: &str, body: String) -> String {
        let base = sanitize(name);
        let mut candidate = base.clone();
        let mut suffix = 0usize;
        loop {
            match self.rules.get(&candidate) {
                None => {
                    self.rules.insert(candidate.clone(), body);
                    return candidate;
                }
                Some(existing) if *existing == body => return candidate,
                Some(_) => {
                    candidate = format!("{}{}", base, suffix);
                    suffix += 1;
                }
            }
        }
    }

    fn add_primitive(&mut self, name: &'static str) -> String {
        if self.rules.contains_key(name) {
            return name.to_string();
        }
        if let Some((body, dependencies)) = primitive(name) {
            self.rules.insert(name.to_string(), body.to_string());
            for dependency in dependencies {
                self.add_primitive(*dependency);
            }
        }
        name.to_string()
    }

    /// Points `name` at a built-in rule. Only the root needs its own rule.
    fn alias(&mut self, name: &str, primitive: &'static str) -> String {
        let target = self.add_primitive(primitive);
        if name == ROOT {
            self.add_rule(ROOT, target)
        } else {
            target
        }
    }

    fn visit(&mut self, schema: &Value, name: &str, path: &str) -> Result<String, GrammarError> {
        let schema = match schema {
            Value::Object(schema) => schema,
            Value::Bool(true) => return Ok(self.alias(name, "value")),
            _ => return Err(unsupported(path, "schema must be an object")),
        };

        if let Some(alternatives) = schema.get("oneOf").or_else(|| schema.get("anyOf")) {
            let alternatives = alternatives
                .as_array()
                .filter(|a| !a.is_empty())
                .ok_or_else(|| unsupported(path, "oneOf/anyOf must be a non-empty array"))?;
            let mut rule_names = Vec::with_capacity(alternatives.len());
            for (i, alternative) in alternatives.iter().enumerate() {
                rule_names.push(self.visit(
                    alternative,
                    &format!("{}-{}", name, i),
                    &format!("{}/oneOf/{}", path, i),
                )?);
            }
            return Ok(self.add_rule(name, rule_names.join(" | ")));
        }

        if let Some(constant) = schema.get("const") {
            self.add_primitive("space");
            let body = format!("{} space", literal(constant, path)?);
            return Ok(self.add_rule(name, body));
        }

        if let Some(values) = schema.get("enum") {
            let values = values
                .as_array()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| unsupported(path, "enum must be a non-empty array"))?;
            let literals = values
                .iter()
                .map(|v| literal(v, path))
                .collect::<Result<Vec<_>, _>>()?;
            self.add_primitive("space");
            return Ok(self.add_rule(name, format!("({}) space", literals.join(" | "))));
        }

        match schema.get("type").and_then(Value::as_str) {
            Some("object") | None if schema.get("properties").is_some_and(Value::is_object) => {
                self.visit_object(schema, name, path)
            }
            Some("object") => Ok(self.alias(name, "object")),
            Some("array") => self.visit_array(schema, name, path),
            Some("string") => Ok(self.alias(name, "string")),
            Some("number") => Ok(self.alias(name, "number")),
            Some("integer") => Ok(self.alias(name, "integer")),
            Some("boolean") => Ok(self.alias(name, "boolean")),
            Some("null") => Ok(self.alias(name, "null")),
            None => Ok(self.alias(name, "value")),
            Some(other) => Err(unsupported(path, &format!("unsupported type {:?}", other))),
        }
    }

    fn visit_object(
        &mut self,
        schema: &Map<String, Value>,
        name: &str,
        path: &str,
    ) -> Result<String, GrammarError> {
        let empty = Map::new();
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let mut ordered: Vec<(&String, &Value)> = properties.iter().collect();
        let rank = |key: &str| {
            self.prop_order
                .iter()
                .position(|p| p == key)
                .unwrap_or(usize::MAX)
        };
        ordered.sort_by(|(a, _), (b, _)| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));

        self.add_primitive("space");
        let mut body = String::from(r#""{" space"#);
        for (i, (key, property)) in ordered.into_iter().enumerate() {
            let rule = self.visit(
                property,
                &format!("{}-{}", name, key),
                &format!("{}/properties/{}", path, key),
            )?;
            if i > 0 {
                body.push_str(r#" "," space"#);
            }
            body.push_str(&format!(
                r#" {} space ":" space {}"#,
                literal(&Value::String(key.clone()), path)?,
                rule
            ));
        }
        body.push_str(r#" "}" space"#);

        Ok(self.add_rule(name, body))
    }

    fn visit_array(
        &mut self,
        schema: &Map<String, Value>,
        name: &str,
        path: &str,
    ) -> Result<String, GrammarError> {
        let item = match schema.get("items") {
            Some(items) => self.visit(
                items,
                &format!("{}-item", name),
                &format!("{}/items", path),
            )?,
            None => self.add_primitive("value"),
        };
        self.add_primitive("space");
        let body = format!(
            r#""[" space ({} ("," space {})*)? "]" space"#,
            item, item
        );
        Ok(self.add_rule(name, body))
    }

    fn format(&self) -> String {
        let root = self
            .rules
            .get(ROOT)
            .map(|body| format!("{} ::= {}", ROOT, body));
        root.into_iter()
            .chain(
                self.rules
                    .iter()
                    .filter(|(name, _)| name.as_str() != ROOT)
                    .map(|(name, body)| format!("{} ::= {}", name, body)),
            )
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// GBNF literal matching the JSON encoding of `value`.
fn literal(value: &Value, path: &str) -> Result<String, GrammarError> {
    let json = serde_json::to_string(value).map_err(|e| unsupported(path, &e.to_string()))?;
    let mut escaped = String::with_capacity(json.len() + 2);
    escaped.push('"');
    for c in json.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    escaped.push('"');
    Ok(escaped)
}

fn sanitize(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            sanitized.push(c);
        } else if !sanitized.ends_with('-') {
            sanitized.push('-');
        }
    }
    sanitized
}

fn unsupported(path: &str, message: &str) -> GrammarError {
    GrammarError::new(GrammarErrorKind::UnsupportedSchema {
        path: path.to_string(),
        message: message.to_string(),
    })
}
