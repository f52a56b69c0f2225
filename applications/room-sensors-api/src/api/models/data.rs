use room_sensors::SeriesSet;
use serde::Serialize;

pub const DEFAULT_RANGE: &str = "30m";
pub const DEFAULT_INTERVAL: &str = "15s";

#[derive(Debug, Default, PartialEq)]
pub struct DataQuery {
    pub range: Option<String>,
    pub interval: Option<String>,
}

impl DataQuery {
    /// Pick the known parameters out of the decoded query pairs. A parameter
    /// given more than once is rejected by name; unknown ones are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, &'static str> {
        let mut query = DataQuery::default();
        for (key, value) in pairs {
            let (name, slot) = match key.as_str() {
                "range" => ("range", &mut query.range),
                "interval" => ("interval", &mut query.interval),
                _ => continue,
            };
            if slot.replace(value).is_some() {
                return Err(name);
            }
        }
        Ok(query)
    }
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub data: SeriesSet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_from_pairs() {
        let query =
            DataQuery::from_pairs(pairs(&[("interval", "1m"), ("x", "y"), ("range", "2h")]))
                .unwrap();
        assert_eq!(
            query,
            DataQuery {
                range: Some("2h".into()),
                interval: Some("1m".into()),
            }
        );
        assert_eq!(DataQuery::from_pairs(Vec::new()).unwrap(), DataQuery::default());
    }

    #[test]
    fn test_duplicate_parameter_is_named() {
        assert_eq!(
            DataQuery::from_pairs(pairs(&[("range", "1h"), ("range", "2h")])),
            Err("range")
        );
        assert_eq!(
            DataQuery::from_pairs(pairs(&[("interval", "1m"), ("range", "1h"), ("interval", "1m")])),
            Err("interval")
        );
    }
}
