use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced while navigating a schema-driven data tree.
///
/// The first group is raised by the navigation core itself. Backend kinds are
/// produced by a `DataAccessLayer` implementation and passed through untouched.
#[derive(Debug, Error)]
pub enum Error {
    #[error("The path: {0} does not point to a valid schema node")]
    NoSuchSchemaNode(String),

    #[error("The schema structure at {path} of kind {kind} is not supported")]
    UnrecognizedSchemaKind { path: String, kind: String },

    #[error("The path: {path} is a list requiring {required} keys but was given {given} keys")]
    WrongKeyArity {
        path: String,
        required: usize,
        given: usize,
    },

    #[error("The path: {path} is a list, reach {attr} through an element by key or iteration")]
    ListItemsMustBeAccessedByElement { path: String, attr: String },

    #[error("The node: {kind} at {path} has no value")]
    NodeHasNoValue { kind: String, path: String },

    #[error("Operation {operation} is not supported on a {variant} ({path})")]
    UnsupportedOperationForVariant {
        operation: String,
        variant: String,
        path: String,
    },

    #[error("The list key: {key} for {path} cannot be blank")]
    ListKeyCannotBeBlank { path: String, key: String },

    #[error("The list item for {0} cannot be blank")]
    ListItemCannotBeBlank(String),

    #[error("The list key: {key} for {path} cannot be changed")]
    ListKeyCannotBeChanged { path: String, key: String },

    #[error("Cannot assign a value to {0}")]
    CannotAssignValueToContainingNode(String),

    #[error("The value {value} is not valid for the enumeration at path {path}")]
    ValueDoesNotMatchEnumeration { path: String, value: String },

    #[error("Unable to match the value '{value}' to a type for path {path}")]
    ValueNotMappedToType { path: String, value: String },

    #[error("The key value {0} contains both quote characters and cannot be encoded")]
    InvalidListKeyValue(String),

    #[error("Unable to decode the following path: {0}")]
    PathDecoding(String),

    #[error("This node is read-only")]
    ReadOnly,

    #[error("The list does not contain the list element: {0}")]
    ListDoesNotContainElement(String),

    #[error("{}", backend_message(.0))]
    BackendDatastore(Vec<(String, String)>),

    #[error("Not connected to the datastore - try to reconnect")]
    NotConnected,

    #[error("The commit failed.\n{0}")]
    CommitFailed(String),

    #[error("Validation failed.\n{0}")]
    ValidationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

const MAX_REPORTED_BACKEND_ERRORS: usize = 10;

fn backend_message(errors: &[(String, String)]) -> String {
    let mut message = if errors.len() > MAX_REPORTED_BACKEND_ERRORS {
        format!(
            "{} Errors occurred - restricting to the first {}\n",
            errors.len(),
            MAX_REPORTED_BACKEND_ERRORS
        )
    } else {
        format!("{} Errors occurred\n", errors.len())
    };
    for (idx, (error, path)) in errors.iter().take(MAX_REPORTED_BACKEND_ERRORS).enumerate() {
        message.push_str(&format!("Error {}: {} (Path: {})\n", idx, error, path));
    }
    message
}

impl Error {
    pub fn no_such_schema_node<S: AsRef<str>>(path: S) -> Self {
        Error::NoSuchSchemaNode(path.as_ref().into())
    }

    pub fn unrecognized_schema_kind<S: AsRef<str>, K: AsRef<str>>(path: S, kind: K) -> Self {
        Error::UnrecognizedSchemaKind {
            path: path.as_ref().into(),
            kind: kind.as_ref().into(),
        }
    }

    pub fn wrong_key_arity<S: AsRef<str>>(path: S, required: usize, given: usize) -> Self {
        Error::WrongKeyArity {
            path: path.as_ref().into(),
            required,
            given,
        }
    }

    pub fn list_items_must_be_accessed_by_element<S: AsRef<str>, A: AsRef<str>>(
        path: S,
        attr: A,
    ) -> Self {
        Error::ListItemsMustBeAccessedByElement {
            path: path.as_ref().into(),
            attr: attr.as_ref().into(),
        }
    }

    pub fn node_has_no_value<K: AsRef<str>, S: AsRef<str>>(kind: K, path: S) -> Self {
        Error::NodeHasNoValue {
            kind: kind.as_ref().into(),
            path: path.as_ref().into(),
        }
    }

    pub fn unsupported<O: AsRef<str>, V: AsRef<str>, S: AsRef<str>>(
        operation: O,
        variant: V,
        path: S,
    ) -> Self {
        Error::UnsupportedOperationForVariant {
            operation: operation.as_ref().into(),
            variant: variant.as_ref().into(),
            path: path.as_ref().into(),
        }
    }

    pub fn list_does_not_contain_element<S: AsRef<str>>(path: S) -> Self {
        Error::ListDoesNotContainElement(path.as_ref().into())
    }

    /// A single backend failure at `path`.
    pub fn backend<M: AsRef<str>, S: AsRef<str>>(message: M, path: S) -> Self {
        Error::BackendDatastore(vec![(message.as_ref().into(), path.as_ref().into())])
    }

    pub fn value_not_mapped<S: AsRef<str>, V: AsRef<str>>(path: S, value: V) -> Self {
        Error::ValueNotMappedToType {
            path: path.as_ref().into(),
            value: value.as_ref().into(),
        }
    }

    pub fn path_decoding<S: AsRef<str>>(path: S) -> Self {
        Error::PathDecoding(path.as_ref().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_truncates() {
        let errors: Vec<(String, String)> = (0..12)
            .map(|i| (format!("bad {}", i), format!("/m:x{}", i)))
            .collect();
        let msg = Error::BackendDatastore(errors).to_string();
        assert!(msg.starts_with("12 Errors occurred - restricting to the first 10"));
        assert!(msg.contains("Error 9: bad 9 (Path: /m:x9)"));
        assert!(!msg.contains("bad 10"));
    }

    #[test]
    fn test_wrong_key_arity_display() {
        let err = Error::wrong_key_arity("/m:twokeylist", 2, 1);
        assert_eq!(
            err.to_string(),
            "The path: /m:twokeylist is a list requiring 2 keys but was given 1 keys"
        );
    }
}
