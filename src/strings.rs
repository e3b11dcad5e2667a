use std::collections::HashMap;

use crate::error::{Error, Result};

/// Deduplicated strings referenced by index from other blocks.
///
/// Index 0 is always the empty string and stands for "absent".
#[derive(Debug, Clone)]
pub struct StringTable {
    strings: Vec<String>,
    index: HashMap<String, u32>,
}

impl Default for StringTable {
    fn default() -> Self {
        StringTable::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        StringTable {
            strings: vec![String::new()],
            index: HashMap::new(),
        }
    }

    /// Restores a table read from a file.
    pub fn from_strings(strings: Vec<String>) -> Result<Self> {
        if strings.is_empty() {
            return Ok(StringTable::new());
        }
        if !strings[0].is_empty() {
            return Err(Error::Format(
                "string table does not start with an empty string".to_string(),
            ));
        }
        let index = strings
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, s)| (s.clone(), i as u32))
            .collect();
        Ok(StringTable { strings, index })
    }

    pub fn add(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(i) = self.index.get(value) {
            return *i;
        }
        let i = self.strings.len() as u32;
        self.strings.push(value.to_string());
        self.index.insert(value.to_string(), i);
        i
    }

    pub fn get(&self, i: u32) -> Result<&str> {
        self.strings
            .get(i as usize)
            .map(|s| s.as_str())
            .ok_or_else(|| {
                Error::Format(format!(
                    "string {} is outside of the table of {}",
                    i,
                    self.strings.len()
                ))
            })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(|s| s.as_str())
    }

    pub fn into_strings(self) -> Vec<String> {
        self.strings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_index_zero() {
        let mut table = StringTable::new();
        assert_eq!(table.add(""), 0);
        assert_eq!(table.get(0).unwrap(), "");
        assert!(table.is_empty());
    }

    #[test]
    fn strings_are_deduplicated() {
        let mut table = StringTable::new();
        let a = table.add("Europe/Prague");
        let b = table.add("Hlavní nádraží");
        assert_eq!(table.add("Europe/Prague"), a);
        assert_eq!((a, b), (1, 2));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn restored_table_keeps_indices() {
        let table =
            StringTable::from_strings(vec!["".into(), "A".into(), "B".into()]).unwrap();
        assert_eq!(table.get(2).unwrap(), "B");
        assert!(table.get(3).is_err());
        assert!(StringTable::from_strings(vec!["A".into()]).is_err());
    }
}
