//! Read-only view over a response message's element tree.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use volcurve_types::{VolcurveError, parse_date};

/// A named node in a response message.
///
/// Sequences are JSON objects, arrays are JSON arrays and everything else is
/// a scalar value. Lookups of absent children fail with
/// [`VolcurveError::MissingElement`].
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    name: &'a str,
    value: &'a Value,
}

impl<'a> Element<'a> {
    /// Wraps a JSON value as an element with the given name.
    #[must_use]
    pub const fn new(name: &'a str, value: &'a Value) -> Self {
        Self { name, value }
    }

    /// Returns the element name.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(&self) -> &'a Value {
        self.value
    }

    /// Returns true if this element is an array.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }

    /// Looks up a child element, returning `None` if absent.
    #[must_use]
    pub fn try_element(&self, name: &str) -> Option<Self> {
        self.value
            .as_object()?
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .map(|(key, value)| Self::new(key, value))
    }

    /// Looks up a child element.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::MissingElement`] if there is no such child.
    pub fn get_element(&self, name: &str) -> Result<Self, VolcurveError> {
        self.try_element(name)
            .ok_or_else(|| VolcurveError::MissingElement(format!("{}.{name}", self.name)))
    }

    /// Iterates over the values of this element.
    ///
    /// Arrays yield their items; any other element yields itself once.
    pub fn values(&self) -> impl Iterator<Item = Self> + 'a {
        let name = self.name;
        let items: &'a [Value] = match self.value {
            Value::Array(items) => items.as_slice(),
            other => std::slice::from_ref(other),
        };
        items.iter().map(move |v| Self::new(name, v))
    }

    /// Iterates over the children of a sequence element, in message order.
    pub fn elements(&self) -> impl Iterator<Item = Self> + 'a {
        self.value
            .as_object()
            .into_iter()
            .flat_map(|map| map.iter().map(|(k, v)| Self::new(k, v)))
    }

    /// Returns the value as a string slice.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::ElementType`] if the value is not a string.
    pub fn as_str(&self) -> Result<&'a str, VolcurveError> {
        self.value.as_str().ok_or_else(|| self.type_error("a string"))
    }

    /// Returns the value as a float.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::ElementType`] if the value is not numeric.
    pub fn as_f64(&self) -> Result<f64, VolcurveError> {
        self.value.as_f64().ok_or_else(|| self.type_error("a number"))
    }

    /// Returns the value as an integer; integral floats are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::ElementType`] if the value is not integral.
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Result<i64, VolcurveError> {
        self.value
            .as_i64()
            .or_else(|| {
                self.value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| self.type_error("an integer"))
    }

    /// Returns the value as a naive datetime.
    ///
    /// Accepts `YYYY-MM-DDTHH:MM:SS[.fff]` or an RFC 3339 timestamp, which is
    /// normalised to UTC.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::ElementType`] if the value is not a datetime.
    pub fn as_datetime(&self) -> Result<NaiveDateTime, VolcurveError> {
        let s = self.as_str()?;
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_utc()))
            .map_err(|_| self.type_error("a datetime"))
    }

    /// Returns the value as a date.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::ElementType`] if the value is not a date.
    pub fn as_date(&self) -> Result<NaiveDate, VolcurveError> {
        let s = self.as_str()?;
        parse_date(s)
            .or_else(|_| self.as_datetime().map(|dt| dt.date()))
            .map_err(|_| self.type_error("a date"))
    }

    /// Renders a scalar value as text; strings are returned unquoted.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Shorthand for `get_element(name)?.as_str()`.
    ///
    /// # Errors
    ///
    /// Propagates lookup and type errors.
    pub fn element_as_str(&self, name: &str) -> Result<&'a str, VolcurveError> {
        self.get_element(name)?.as_str()
    }

    /// Shorthand for `get_element(name)?.as_f64()`.
    ///
    /// # Errors
    ///
    /// Propagates lookup and type errors.
    pub fn element_as_f64(&self, name: &str) -> Result<f64, VolcurveError> {
        self.get_element(name)?.as_f64()
    }

    /// Shorthand for `get_element(name)?.as_i64()`.
    ///
    /// # Errors
    ///
    /// Propagates lookup and type errors.
    pub fn element_as_i64(&self, name: &str) -> Result<i64, VolcurveError> {
        self.get_element(name)?.as_i64()
    }

    /// Shorthand for `get_element(name)?.as_datetime()`.
    ///
    /// # Errors
    ///
    /// Propagates lookup and type errors.
    pub fn element_as_datetime(&self, name: &str) -> Result<NaiveDateTime, VolcurveError> {
        self.get_element(name)?.as_datetime()
    }

    fn type_error(&self, expected: &'static str) -> VolcurveError {
        VolcurveError::ElementType {
            name: self.name.to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_element() {
        let body = json!({"barData": {}});
        let root = Element::new("IntradayBarResponse", &body);
        let err = root.get_element("barData").unwrap().get_element("barTickData");
        assert!(matches!(err, Err(VolcurveError::MissingElement(path)) if path == "barData.barTickData"));
    }

    #[test]
    fn test_values_array_and_scalar() {
        let body = json!({"list": [1, 2, 3], "one": "x"});
        let root = Element::new("msg", &body);
        assert_eq!(root.get_element("list").unwrap().values().count(), 3);
        assert_eq!(root.get_element("one").unwrap().values().count(), 1);
    }

    #[test]
    fn test_scalar_conversions() {
        let body = json!({
            "size": 300.0,
            "value": 1520.5,
            "time": "2016-04-11T00:00:05.000",
            "zoned": "2016-04-11T09:00:05+09:00",
            "date": "2016-04-11",
        });
        let root = Element::new("msg", &body);
        assert_eq!(root.element_as_i64("size").unwrap(), 300);
        assert!((root.element_as_f64("value").unwrap() - 1520.5).abs() < 1e-10);
        assert_eq!(
            root.element_as_datetime("time").unwrap(),
            root.element_as_datetime("zoned").unwrap()
        );
        assert_eq!(
            root.get_element("date").unwrap().as_date().unwrap(),
            NaiveDate::from_ymd_opt(2016, 4, 11).unwrap()
        );
        assert!(matches!(
            root.element_as_str("size"),
            Err(VolcurveError::ElementType { expected: "a string", .. })
        ));
    }

    #[test]
    fn test_elements_preserve_order() {
        let body = json!({"b": 1, "a": 2});
        let root = Element::new("msg", &body);
        let names: Vec<_> = root.elements().map(|e| e.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
