//! Upload reply shapes: the asset store answers in several layouts depending
//! on endpoint version and file count. Each extractor handles one layout; the
//! first one that recognises the body wins.

use serde::Serialize;
use serde_json::Value;

/// One file as reported back by the asset store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedFile {
    pub asset_id: String,
    pub file_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type ShapeExtractor = fn(&Value) -> Option<Vec<UploadedFile>>;

/// Ordered: `results[]`, `files[]`, singular `asset_id`, singular `id`,
/// top-level array.
const UPLOAD_SHAPES: &[(&str, ShapeExtractor)] = &[
    ("results", results_list),
    ("files", files_list),
    ("asset_id", single_asset_id),
    ("id", single_id),
    ("array", top_level_array),
];

/// Resolves the store's reply into a list of uploaded files.
/// Unrecognised bodies produce an empty list.
pub fn extract_uploaded_files(body: &Value) -> Vec<UploadedFile> {
    for (shape, extract) in UPLOAD_SHAPES {
        if let Some(files) = extract(body) {
            tracing::debug!(shape, count = files.len(), "matched upload reply shape");
            return files;
        }
    }
    Vec::new()
}

/// Asset ids of the entries that succeeded and carry an id, in upload order.
pub fn successful_asset_ids(files: &[UploadedFile]) -> Vec<String> {
    files
        .iter()
        .filter(|f| f.success && !f.asset_id.is_empty())
        .map(|f| f.asset_id.clone())
        .collect()
}

fn results_list(body: &Value) -> Option<Vec<UploadedFile>> {
    file_list(body.get("results"))
}

fn files_list(body: &Value) -> Option<Vec<UploadedFile>> {
    file_list(body.get("files"))
}

fn single_asset_id(body: &Value) -> Option<Vec<UploadedFile>> {
    single_file(body, "asset_id")
}

fn single_id(body: &Value) -> Option<Vec<UploadedFile>> {
    single_file(body, "id")
}

fn top_level_array(body: &Value) -> Option<Vec<UploadedFile>> {
    file_list(Some(body))
}

fn file_list(value: Option<&Value>) -> Option<Vec<UploadedFile>> {
    let items = value?.as_array().filter(|arr| !arr.is_empty())?;
    Some(items.iter().map(file_entry).collect())
}

fn single_file(body: &Value, id_key: &str) -> Option<Vec<UploadedFile>> {
    let asset_id = text_value(body.get(id_key))?;
    Some(vec![UploadedFile {
        asset_id,
        file_name: first_str(body, &["file_name", "filename"]),
        success: true,
        error: None,
    }])
}

fn file_entry(entry: &Value) -> UploadedFile {
    UploadedFile {
        asset_id: first_str(entry, &["asset_id", "id"]),
        file_name: first_str(entry, &["file_name", "filename", "name"]),
        success: entry
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        error: entry
            .get("error")
            .and_then(Value::as_str)
            .map(String::from),
    }
}

fn first_str(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| text_value(value.get(*k)))
        .unwrap_or_default()
}

/// Non-empty strings as-is, non-zero numbers stringified.
fn text_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(body: Value) -> Vec<String> {
        successful_asset_ids(&extract_uploaded_files(&body))
    }

    #[test]
    fn test_numeric_ids_are_stringified() {
        assert_eq!(ids(json!({"asset_id": 4012})), vec!["4012"]);
        assert_eq!(ids(json!({"id": 77, "filename": "cv.pdf"})), vec!["77"]);
        assert_eq!(ids(json!({"results": [{"id": 5}, {"asset_id": 0}]})), vec!["5"]);
    }

    #[test]
    fn test_every_documented_shape_yields_the_same_ids() {
        let shapes = [
            json!({"results": [{"asset_id": "a1", "file_name": "cv.pdf", "success": true}]}),
            json!({"files": [{"id": "a1", "filename": "cv.pdf"}]}),
            json!({"asset_id": "a1", "file_name": "cv.pdf"}),
            json!({"id": "a1"}),
            json!([{"asset_id": "a1", "name": "cv.pdf"}]),
        ];
        for body in shapes {
            assert_eq!(ids(body.clone()), vec!["a1".to_string()], "shape: {body}");
        }
    }

    #[test]
    fn test_results_take_precedence_over_files() {
        let body = json!({
            "results": [{"asset_id": "from-results"}],
            "files": [{"asset_id": "from-files"}]
        });
        assert_eq!(ids(body), vec!["from-results".to_string()]);
    }

    #[test]
    fn test_empty_results_fall_through_to_next_shape() {
        let body = json!({"results": [], "asset_id": "single"});
        assert_eq!(ids(body), vec!["single".to_string()]);
    }

    #[test]
    fn test_failed_and_idless_entries_are_excluded_in_order() {
        let body = json!({"results": [
            {"asset_id": "a1"},
            {"asset_id": "a2", "success": false, "error": "virus"},
            {"file_name": "no-id.pdf"},
            {"id": "a3"}
        ]});
        let files = extract_uploaded_files(&body);
        assert_eq!(files.len(), 4);
        assert_eq!(files[1].error.as_deref(), Some("virus"));
        assert_eq!(
            successful_asset_ids(&files),
            vec!["a1".to_string(), "a3".to_string()]
        );
    }

    #[test]
    fn test_file_name_falls_back_across_keys() {
        let files = extract_uploaded_files(&json!({"files": [{"id": "x", "name": "resume.docx"}]}));
        assert_eq!(files[0].file_name, "resume.docx");
    }

    #[test]
    fn test_unrecognised_body_yields_nothing() {
        assert!(extract_uploaded_files(&json!({"status": "ok"})).is_empty());
        assert!(extract_uploaded_files(&json!([])).is_empty());
        assert!(extract_uploaded_files(&json!("done")).is_empty());
    }
}
