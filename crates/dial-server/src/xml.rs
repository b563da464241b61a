//! DIAL `<service>` XML document construction (spec.md §4.9).
//!
//! Grounded on the original's `GET_APP_response_builder` family: a fixed element
//! order, `<options .../>` only when at least one option is set, `<link rel="run"/>`
//! omitted exactly when the app is stopped, and `<additionalData>` present only when
//! there is something to report. Unlike the original — which always emits an empty
//! `<additionalData/>` because the field is only ever null-checked, never populated —
//! this builder renders the real cached auxiliary-data map (SPEC_FULL.md OQ-1).

use dial_core::AppState;
use std::collections::BTreeMap;

pub struct XmlResponseBuilder {
    schema_uri: String,
}

impl XmlResponseBuilder {
    pub fn new(schema_uri: impl Into<String>) -> Self {
        Self {
            schema_uri: schema_uri.into(),
        }
    }

    /// Renders the `<service>` document for a GET_app response.
    ///
    /// `options` is the generic `key="value"` attribute set (e.g. `allowStop`);
    /// `additional_data` is the app's current auxiliary-data map, as last set via a
    /// `dial_data` POST.
    pub fn render(
        &self,
        app_name: &str,
        state: AppState,
        options: &[(String, String)],
        additional_data: &BTreeMap<String, String>,
    ) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!(
            "<service xmlns=\"{}\" dialVer=\"2.1\">\n",
            escape(&self.schema_uri)
        ));
        out.push_str(&format!("  <name>{}</name>\n", escape(app_name)));

        if !options.is_empty() {
            let attrs: String = options
                .iter()
                .map(|(k, v)| format!(" {}=\"{}\"", escape(k), escape(v)))
                .collect();
            out.push_str(&format!("  <options{attrs}/>\n"));
        }

        out.push_str(&format!("  <state>{}</state>\n", state.as_dial_str()));

        if state != AppState::Stopped {
            out.push_str("  <link rel=\"run\" href=\"run\"/>\n");
        }

        if !additional_data.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(additional_data.iter())
                .finish();
            out.push_str(&format!("  <additionalData>{}</additionalData>\n", escape(&encoded)));
        }

        out.push_str("</service>");
        out
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> XmlResponseBuilder {
        XmlResponseBuilder::new("urn:dial-multiscreen-org:schemas:dial")
    }

    #[test]
    fn running_app_has_link_and_no_options() {
        let xml = builder().render("Netflix", AppState::Running, &[], &BTreeMap::new());
        assert!(xml.contains("<name>Netflix</name>"));
        assert!(xml.contains("<state>running</state>"));
        assert!(xml.contains("<link rel=\"run\" href=\"run\"/>"));
        assert!(!xml.contains("<options"));
        assert!(!xml.contains("<additionalData>"));
    }

    #[test]
    fn stopped_app_omits_link() {
        let xml = builder().render("Netflix", AppState::Stopped, &[], &BTreeMap::new());
        assert!(xml.contains("<state>stopped</state>"));
        assert!(!xml.contains("<link"));
    }

    #[test]
    fn options_rendered_when_present() {
        let xml = builder().render(
            "Netflix",
            AppState::Running,
            &[("allowStop".to_string(), "true".to_string())],
            &BTreeMap::new(),
        );
        assert!(xml.contains("<options allowStop=\"true\"/>"));
    }

    #[test]
    fn additional_data_rendered_when_present() {
        let mut data = BTreeMap::new();
        data.insert("k".to_string(), "v".to_string());
        let xml = builder().render("Netflix", AppState::Running, &[], &data);
        assert!(xml.contains("<additionalData>k=v</additionalData>"));
    }

    #[test]
    fn escapes_reserved_xml_characters() {
        let xml = builder().render("A&B", AppState::Running, &[], &BTreeMap::new());
        assert!(xml.contains("<name>A&amp;B</name>"));
    }
}
