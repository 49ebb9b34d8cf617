//! Filesystem-scan registry.
//!
//! Answers lookups by scanning the storage root with a path template and
//! matching captured fields against the query constraints. Fields not
//! captured from the path cannot match; probing file contents for metadata
//! belongs to external codecs.

use super::{Constraint, LookupQuery, Registry};
use crate::error::RepoResult;
use crate::model::DataValue;
use crate::registry::scanner::PathTemplate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub struct FsRegistry {
    root: PathBuf,
}

impl FsRegistry {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl Registry for FsRegistry {
    fn lookup(&self, query: &LookupQuery) -> RepoResult<Vec<Vec<DataValue>>> {
        // Without a template there is nothing to scan for.
        let Some(template) = &query.template else {
            return Ok(Vec::new());
        };
        let template = PathTemplate::parse(template)?;

        let mut result = Vec::new();
        for (_path, found) in template.scan(&self.root)? {
            if !satisfies(&found, &query.data_id) {
                continue;
            }
            let tuple: Option<Vec<DataValue>> = query
                .properties
                .iter()
                .map(|property| found.get(property).cloned())
                .collect();
            // A file that does not expose every requested property is an
            // incomplete match and is skipped.
            if let Some(tuple) = tuple {
                result.push(tuple);
            }
        }
        Ok(result)
    }
}

fn satisfies(
    found: &BTreeMap<String, DataValue>,
    constraints: &BTreeMap<String, Constraint>,
) -> bool {
    constraints.iter().all(|(key, constraint)| {
        let Some(value) = found.get(key) else {
            return false;
        };
        match constraint {
            Constraint::Equals(expected) => value == expected,
            Constraint::Range(low, high) => low <= value && value <= high,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::FsRegistry;
    use crate::model::DataValue;
    use crate::registry::{Constraint, LookupQuery, Registry};
    use std::fs;

    fn seeded_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(dir.path().join("raw")).expect("mkdir");
        for name in ["raw_v1_fg.fits.gz", "raw_v2_fg.fits.gz", "raw_v3_fr.fits.gz"] {
            fs::write(dir.path().join("raw").join(name), b"x").expect("write");
        }
        dir
    }

    fn query_for(properties: &[&str]) -> LookupQuery {
        LookupQuery {
            properties: properties.iter().map(|p| p.to_string()).collect(),
            template: Some("raw/raw_v%(visit)d_f%(filter)s.fits.gz".to_string()),
            ..LookupQuery::default()
        }
    }

    #[test]
    fn returns_property_tuples_for_matching_files() {
        let root = seeded_root();
        let registry = FsRegistry::new(root.path());

        let mut query = query_for(&["filter"]);
        query
            .data_id
            .insert("visit".to_string(), Constraint::Equals(DataValue::Int(1)));

        let rows = registry.lookup(&query).expect("lookup should succeed");
        assert_eq!(rows, vec![vec![DataValue::Text("g".to_string())]]);
    }

    #[test]
    fn range_constraints_filter_numeric_captures() {
        let root = seeded_root();
        let registry = FsRegistry::new(root.path());

        let mut query = query_for(&["visit"]);
        query.data_id.insert(
            "visit".to_string(),
            Constraint::Range(DataValue::Int(2), DataValue::Int(3)),
        );

        let mut rows = registry.lookup(&query).expect("lookup should succeed");
        rows.sort();
        assert_eq!(rows, vec![vec![DataValue::Int(2)], vec![DataValue::Int(3)]]);
    }

    #[test]
    fn missing_template_yields_no_rows() {
        let root = seeded_root();
        let registry = FsRegistry::new(root.path());
        let query = LookupQuery {
            properties: vec!["visit".to_string()],
            ..LookupQuery::default()
        };
        assert!(registry.lookup(&query).expect("lookup").is_empty());
    }
}
