use serde_json::Value;
use std::collections::VecDeque;

/// Collect every comment's `body_html` from a `/comments/{id}` response.
///
/// The tree is walked breadth-first: top-level comments in listing order, then
/// their replies. "Load more" stubs and deleted bodies are skipped.
pub fn flatten_comment_tree(response: &Value) -> Vec<String> {
    let mut queue: VecDeque<&Value> = VecDeque::new();
    // The response is `[submission listing, comment listing]`.
    if let Some(top_level) = response.get(1).and_then(listing_children) {
        queue.extend(top_level);
    }

    let mut bodies = Vec::new();
    while let Some(node) = queue.pop_front() {
        if node.get("kind").and_then(Value::as_str) != Some("t1") {
            continue;
        }
        let Some(data) = node.get("data") else {
            continue;
        };
        if let Some(body) = data.get("body_html").and_then(Value::as_str) {
            bodies.push(body.to_string());
        }
        // `replies` is an empty string when there are none.
        if let Some(replies) = data.get("replies").and_then(listing_children) {
            queue.extend(replies);
        }
    }
    bodies
}

fn listing_children(listing: &Value) -> Option<&Vec<Value>> {
    listing.get("data")?.get("children")?.as_array()
}
