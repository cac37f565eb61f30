use std::{fmt, sync::Arc};

use crate::{value::Value, Error, Result};

/// The arguments of a call, paired with the names of the parameters they were passed for.
///
/// The number of values always equals the number of names; construction fails otherwise.
/// Lookup by index is constant time, lookup by name scans the parameter list.
///
/// ```rust
/// use dotfake::{args, call::ArgumentCollection, Value};
///
/// let arguments = ArgumentCollection::new(args![1, "abc"], vec!["x".into(), "name".into()])?;
/// assert_eq!(arguments.get(0)?, &Value::I4(1));
/// assert_eq!(arguments.by_name("name")?, &Value::from("abc"));
/// assert!(ArgumentCollection::new(args![1], vec![]).is_err());
/// # Ok::<(), dotfake::Error>(())
/// ```
#[derive(Clone, PartialEq)]
pub struct ArgumentCollection {
    values: Vec<Value>,
    names: Arc<[String]>,
}

impl ArgumentCollection {
    /// Pairs `values` with `names`
    ///
    /// # Errors
    /// Returns [`Error::ArgumentCountMismatch`] if the lengths differ.
    pub fn new(values: Vec<Value>, names: Vec<String>) -> Result<Self> {
        if values.len() != names.len() {
            return Err(Error::ArgumentCountMismatch {
                arguments: values.len(),
                names: names.len(),
            });
        }
        Ok(ArgumentCollection {
            values,
            names: names.into(),
        })
    }

    /// A collection without arguments
    #[must_use]
    pub fn empty() -> Self {
        ArgumentCollection {
            values: Vec::new(),
            names: Arc::from(Vec::new()),
        }
    }

    /// Number of arguments
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the call had no arguments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The argument at `index`
    ///
    /// # Errors
    /// Returns [`Error::ArgumentOutOfRange`] if `index` is not a valid position.
    pub fn get(&self, index: usize) -> Result<&Value> {
        self.values.get(index).ok_or(Error::ArgumentOutOfRange {
            index,
            count: self.values.len(),
        })
    }

    /// The argument passed for the parameter `name`
    ///
    /// # Errors
    /// Returns [`Error::ArgumentNotFound`] if no parameter has that name.
    pub fn by_name(&self, name: &str) -> Result<&Value> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| &self.values[index])
            .ok_or_else(|| Error::ArgumentNotFound(name.to_string()))
    }

    /// Parameter names in declaration order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Argument values in declaration order
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Iterates over the argument values
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Iterates over `(name, value)` pairs
    pub fn named(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Replaces the argument at `index`, used for out and ref write-back
    pub(crate) fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let count = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(Error::ArgumentOutOfRange { index, count })?;
        *slot = value;
        Ok(())
    }

    /// Replaces every argument, the count has to stay the same
    pub(crate) fn replace_all(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.names.len() {
            return Err(Error::ArgumentCountMismatch {
                arguments: values.len(),
                names: self.names.len(),
            });
        }
        self.values = values;
        Ok(())
    }

    /// Consumes the collection, returning the values
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl<'a> IntoIterator for &'a ArgumentCollection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Debug for ArgumentCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.named()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let result = ArgumentCollection::new(args![1, 2], names(&["a"]));
        assert!(matches!(
            result,
            Err(Error::ArgumentCountMismatch {
                arguments: 2,
                names: 1
            })
        ));

        let result = ArgumentCollection::new(args![], names(&["a"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_lookup() -> Result<()> {
        let arguments = ArgumentCollection::new(args![1, "two"], names(&["one", "two"]))?;
        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments.get(1)?, &Value::from("two"));
        assert_eq!(arguments.by_name("one")?, &Value::I4(1));
        assert_eq!(arguments.names(), &["one".to_string(), "two".to_string()]);

        assert!(matches!(
            arguments.get(2),
            Err(Error::ArgumentOutOfRange { index: 2, count: 2 })
        ));
        assert!(matches!(
            arguments.by_name("three"),
            Err(Error::ArgumentNotFound(name)) if name == "three"
        ));
        Ok(())
    }

    #[test]
    fn test_named_iteration() -> Result<()> {
        let arguments = ArgumentCollection::new(args![true], names(&["flag"]))?;
        let pairs: Vec<(&str, &Value)> = arguments.named().collect();
        assert_eq!(pairs, vec![("flag", &Value::Boolean(true))]);
        assert_eq!((&arguments).into_iter().count(), 1);
        Ok(())
    }

    #[test]
    fn test_write_back() -> Result<()> {
        let mut arguments = ArgumentCollection::new(args![0], names(&["value"]))?;
        arguments.set(0, Value::I4(5))?;
        assert_eq!(arguments.get(0)?, &Value::I4(5));
        assert!(arguments.set(1, Value::Null).is_err());
        assert!(arguments.replace_all(args![1, 2]).is_err());
        assert!(ArgumentCollection::empty().is_empty());
        Ok(())
    }
}
