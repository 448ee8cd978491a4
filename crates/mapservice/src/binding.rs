use crate::ServiceError;

/// Provider script endpoint.
pub const MAPS_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/js";

/// Everything that goes into the provider script URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRequest {
    pub endpoint: String,
    pub api_key: String,
    pub libraries: Vec<String>,
    pub language: String,
    pub region: String,
    pub version: String,
}

impl BindingRequest {
    /// Request with the widget's fixed locale (Norwegian, region NO) and the
    /// quarterly release channel.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: MAPS_ENDPOINT.to_string(),
            api_key: api_key.into(),
            libraries: vec!["places".to_string(), "geometry".to_string()],
            language: "no".to_string(),
            region: "NO".to_string(),
            version: "quarterly".to_string(),
        }
    }

    pub fn url(&self) -> String {
        let libraries: Vec<String> = self.libraries.iter().map(|l| encode_component(l)).collect();
        format!(
            "{}?key={}&libraries={}&language={}&region={}&v={}",
            self.endpoint,
            encode_component(&self.api_key),
            libraries.join(","),
            encode_component(&self.language),
            encode_component(&self.region),
            encode_component(&self.version),
        )
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScriptId(pub u32);

/// The document the provider script is injected into.
pub trait ScriptHost {
    /// Sources of the scripts currently in the document.
    fn script_sources(&self) -> Vec<(ScriptId, String)>;

    /// Appends an async, deferred script element.
    fn insert_script(&mut self, src: &str) -> Result<ScriptId, ServiceError>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BindingLoad {
    /// A script for this URL was already present.
    Existing(ScriptId),
    Inserted(ScriptId),
}

impl BindingLoad {
    pub fn script(self) -> ScriptId {
        match self {
            BindingLoad::Existing(id) | BindingLoad::Inserted(id) => id,
        }
    }
}

/// Ensures exactly one provider script for `request` exists in `host`.
pub fn load_binding(
    host: &mut dyn ScriptHost,
    request: &BindingRequest,
) -> Result<BindingLoad, ServiceError> {
    let url = request.url();
    if let Some((id, _)) = host
        .script_sources()
        .into_iter()
        .find(|(_, src)| src.starts_with(&url))
    {
        tracing::debug!("map binding already present as script {}", id.0);
        return Ok(BindingLoad::Existing(id));
    }

    let id = host.insert_script(&url)?;
    tracing::info!("map binding requested as script {}", id.0);
    Ok(BindingLoad::Inserted(id))
}

#[cfg(test)]
mod tests {
    use super::{BindingLoad, BindingRequest, load_binding};
    use crate::headless::HeadlessDocument;

    #[test]
    fn url_carries_key_libraries_and_locale() {
        let req = BindingRequest::new("abc123");
        assert_eq!(
            req.url(),
            "https://maps.googleapis.com/maps/api/js?key=abc123&libraries=places,geometry&language=no&region=NO&v=quarterly"
        );
    }

    #[test]
    fn url_escapes_reserved_characters() {
        let req = BindingRequest::new("a&b=c d");
        assert!(req.url().contains("key=a%26b%3Dc%20d&"));
    }

    #[test]
    fn second_load_reuses_existing_script() {
        let mut doc = HeadlessDocument::new();
        let req = BindingRequest::new("k");

        let first = load_binding(&mut doc, &req).unwrap();
        let second = load_binding(&mut doc, &req).unwrap();
        assert!(matches!(first, BindingLoad::Inserted(_)));
        assert_eq!(second, BindingLoad::Existing(first.script()));
        assert_eq!(doc.scripts().len(), 1);
    }

    #[test]
    fn different_key_inserts_a_new_script() {
        let mut doc = HeadlessDocument::new();
        load_binding(&mut doc, &BindingRequest::new("one")).unwrap();
        load_binding(&mut doc, &BindingRequest::new("two")).unwrap();
        assert_eq!(doc.scripts().len(), 2);
    }

    #[test]
    fn prefix_match_accepts_extra_query_parameters() {
        let req = BindingRequest::new("k");
        let mut doc = HeadlessDocument::new();
        doc.preload(format!("{}&callback=init", req.url()));
        let load = load_binding(&mut doc, &req).unwrap();
        assert!(matches!(load, BindingLoad::Existing(_)));
        assert_eq!(doc.scripts().len(), 1);
    }
}
