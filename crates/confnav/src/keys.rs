//! Encoding and decoding of list key predicates (`[name='value']`).

use crate::error::{Error, Result};
use crate::schema::SchemaNode;
use crate::value::Value;
use regex::Regex;
use std::sync::LazyLock;

/// A single `[key='literal']` group.
static PREDICATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[([^\[\]=]+)=(?:'([^']*)'|"([^"]*)")\]"#).expect("valid predicate pattern")
});

/// One or more predicate groups anchored at the end of a path.
static TRAILING_PREDICATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\[[^\[\]=]+=(?:'[^']*'|"[^"]*")\])+$"#).expect("valid trailing pattern")
});

/// Quote a literal, preferring single quotes.
///
/// Literals holding both quote characters cannot be represented.
pub fn quote(literal: &str) -> Result<String> {
    match (literal.contains('\''), literal.contains('"')) {
        (true, true) => Err(Error::InvalidListKeyValue(literal.to_string())),
        (true, false) => Ok(format!("\"{}\"", literal)),
        _ => Ok(format!("'{}'", literal)),
    }
}

/// Render already validated predicates.
#[must_use]
pub fn format_predicates(predicates: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, literal) in predicates {
        let quoted = if literal.contains('\'') {
            format!("\"{}\"", literal)
        } else {
            format!("'{}'", literal)
        };
        out.push('[');
        out.push_str(key);
        out.push('=');
        out.push_str(&quoted);
        out.push(']');
    }
    out
}

/// Pair each of `list`'s keys with the literal encoding of the matching value.
///
/// Values are given in schema key order. The count must match exactly, no
/// value may be blank, and each must be acceptable to its key's type.
pub fn key_predicates(list: &SchemaNode, values: &[Value]) -> Result<Vec<(String, String)>> {
    if values.len() != list.keys.len() {
        return Err(Error::wrong_key_arity(&list.path, list.keys.len(), values.len()));
    }
    let mut predicates = Vec::with_capacity(values.len());
    for (key, value) in list.keys.iter().zip(values) {
        if value.is_blank() || *value == Value::Empty {
            return Err(Error::ListKeyCannotBeBlank {
                path: list.path.clone(),
                key: key.name.clone(),
            });
        }
        _ = key.key_type.check(&list.path, value)?;
        let literal = key.key_type.literal(value);
        _ = quote(&literal)?;
        predicates.push((key.name.clone(), literal));
    }
    Ok(predicates)
}

/// Build the predicate suffix selecting one element of `list`.
pub fn encode_keys(list: &SchemaNode, values: &[Value]) -> Result<String> {
    Ok(format_predicates(&key_predicates(list, values)?))
}

/// Parse a run of predicate groups; the whole input must be consumed.
pub fn parse_predicates(text: &str) -> Result<Vec<(String, String)>> {
    let mut predicates = Vec::new();
    let mut consumed = 0;
    for caps in PREDICATE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() != consumed {
            return Err(Error::path_decoding(text));
        }
        consumed = whole.end();
        let key = caps.get(1).map_or("", |m| m.as_str());
        let literal = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        predicates.push((key.to_string(), literal.to_string()));
    }
    if consumed != text.len() {
        return Err(Error::path_decoding(text));
    }
    Ok(predicates)
}

/// Split an element path into its list path and trailing key predicates.
///
/// `/m:a/b[k='1'][j="x"]` decodes to `/m:a/b` and `[(k, 1), (j, x)]`.
pub fn decode_last_predicates(path: &str) -> Result<(String, Vec<(String, String)>)> {
    let found = TRAILING_PREDICATES
        .find(path)
        .ok_or_else(|| Error::path_decoding(path))?;
    let predicates = parse_predicates(found.as_str())?;
    Ok((path[..found.start()].to_string(), predicates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{KeyDef, SchemaKind};
    use crate::value::{LeafType, TypeSpec};

    fn two_key_list() -> SchemaNode {
        let mut node = SchemaNode::root("integrationtest", Vec::new());
        node.name = "twokeylist".to_string();
        node.path = "/integrationtest:twokeylist".to_string();
        node.kind = SchemaKind::List;
        node.keys = vec![
            KeyDef {
                name: "primary".to_string(),
                key_type: TypeSpec::from(LeafType::Boolean),
            },
            KeyDef {
                name: "secondary".to_string(),
                key_type: TypeSpec::from(LeafType::String),
            },
        ];
        node
    }

    #[test]
    fn test_encode_keys() {
        let list = two_key_list();
        let encoded = encode_keys(&list, &[Value::Bool(true), Value::from("it's")]).expect("ok");
        assert_eq!(encoded, "[primary='true'][secondary=\"it's\"]");
    }

    #[test]
    fn test_encode_is_idempotent() {
        let list = two_key_list();
        let values = [Value::Bool(false), Value::from("x")];
        assert_eq!(
            encode_keys(&list, &values).expect("first"),
            encode_keys(&list, &values).expect("second")
        );
    }

    #[test]
    fn test_wrong_arity() {
        let list = two_key_list();
        match encode_keys(&list, &[Value::Bool(true)]) {
            Err(Error::WrongKeyArity {
                required, given, ..
            }) => {
                assert_eq!(required, 2);
                assert_eq!(given, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_both_quotes_rejected() {
        assert!(matches!(
            quote("it's \"quoted\""),
            Err(Error::InvalidListKeyValue(_))
        ));
        let list = two_key_list();
        assert!(matches!(
            encode_keys(&list, &[Value::Bool(true), Value::from("a'b\"c")]),
            Err(Error::InvalidListKeyValue(_))
        ));
    }

    #[test]
    fn test_blank_key_rejected() {
        let list = two_key_list();
        assert!(matches!(
            encode_keys(&list, &[Value::Bool(true), Value::from("")]),
            Err(Error::ListKeyCannotBeBlank { .. })
        ));
    }

    #[test]
    fn test_decode_last_predicates() {
        let (list, preds) =
            decode_last_predicates("/m:outer[a='1']/inner[k='x]y'][j=\"it's\"]").expect("decode");
        assert_eq!(list, "/m:outer[a='1']/inner");
        assert_eq!(
            preds,
            vec![
                ("k".to_string(), "x]y".to_string()),
                ("j".to_string(), "it's".to_string())
            ]
        );
        assert!(matches!(
            decode_last_predicates("/m:outer/inner"),
            Err(Error::PathDecoding(_))
        ));
    }
}
