use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid element format for '{0}'. Expected 'INDEX=SYMBOL' (e.g., '1=C').")]
    InvalidElementFormat(String),

    #[error("Atom type index in '{0}' must be a positive integer.")]
    InvalidIndex(String),

    #[error("Component '{component}' cannot be empty in '{value}'.")]
    EmptyComponent {
        component: &'static str,
        value: String,
    },

    #[error("Atom type {0} is assigned more than once.")]
    DuplicateIndex(u32),
}

/// Parses a single `INDEX=SYMBOL` pair.
pub fn parse_element(value: &str) -> Result<(u32, String), ParseError> {
    let (index, symbol) = value
        .split_once('=')
        .ok_or_else(|| ParseError::InvalidElementFormat(value.to_string()))?;
    let (index, symbol) = (index.trim(), symbol.trim());

    if index.is_empty() {
        return Err(ParseError::EmptyComponent {
            component: "index",
            value: value.to_string(),
        });
    }
    if symbol.is_empty() {
        return Err(ParseError::EmptyComponent {
            component: "symbol",
            value: value.to_string(),
        });
    }

    let index: u32 = index
        .parse()
        .ok()
        .filter(|i| *i > 0)
        .ok_or_else(|| ParseError::InvalidIndex(value.to_string()))?;
    Ok((index, symbol.to_string()))
}

pub fn parse_elements(values: &[String]) -> Result<BTreeMap<u32, String>, ParseError> {
    let mut table = BTreeMap::new();
    for value in values {
        let (index, symbol) = parse_element(value)?;
        if table.insert(index, symbol).is_some() {
            return Err(ParseError::DuplicateIndex(index));
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_element_accepts_valid_pairs() {
        assert_eq!(parse_element("1=C"), Ok((1, "C".to_string())));
        assert_eq!(parse_element(" 12 = Fe "), Ok((12, "Fe".to_string())));
    }

    #[test]
    fn parse_element_rejects_invalid_formats() {
        assert_eq!(
            parse_element("C"),
            Err(ParseError::InvalidElementFormat("C".to_string()))
        );
        assert_eq!(
            parse_element("0=C"),
            Err(ParseError::InvalidIndex("0=C".to_string()))
        );
        assert_eq!(
            parse_element("x=C"),
            Err(ParseError::InvalidIndex("x=C".to_string()))
        );
        assert!(matches!(
            parse_element("=C"),
            Err(ParseError::EmptyComponent { component: "index", .. })
        ));
        assert!(matches!(
            parse_element("1="),
            Err(ParseError::EmptyComponent { component: "symbol", .. })
        ));
    }

    #[test]
    fn parse_elements_orders_by_index_and_rejects_duplicates() {
        let table = parse_elements(&["2=H".to_string(), "1=C".to_string()]).unwrap();
        assert_eq!(table.values().collect::<Vec<_>>(), ["C", "H"]);

        let err = parse_elements(&["1=C".to_string(), "1=O".to_string()]).unwrap_err();
        assert_eq!(err, ParseError::DuplicateIndex(1));
    }
}
