use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use super::client::MqProfile;
use super::store::Document;

/// Parse a JSON array of mqprofile documents, rejecting malformed entries and duplicate ids
pub fn parse_mqprofiles(text: &str) -> Result<Vec<Document>> {
    let values: Vec<Value> = serde_json::from_str(text).context("seed file must be a JSON array")?;

    let mut seen = HashSet::new();
    let mut docs = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        let profile: MqProfile = serde_json::from_value(value.clone())
            .with_context(|| format!("entry {} is not a valid mqprofile", index))?;
        if !seen.insert(profile.mqid.clone()) {
            bail!("duplicate mqid '{}' at entry {}", profile.mqid, index);
        }
        match value {
            Value::Object(doc) => docs.push(doc),
            _ => bail!("entry {} is not an object", index),
        }
    }

    Ok(docs)
}

pub fn load_mqprofiles(path: &Path) -> Result<Vec<Document>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    parse_mqprofiles(&text).with_context(|| format!("invalid seed file {}", path.display()))
}
