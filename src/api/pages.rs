//! Server-rendered HTML for the three pages of the app.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use serde_json::Value;

use crate::history::ResultFileSummary;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem}\
nav a{margin-right:1rem}.flash{background:#fff3cd;border:1px solid #e0c36c;padding:.5rem 1rem;margin:1rem 0}\
table{border-collapse:collapse;width:100%}td,th{border-bottom:1px solid #ddd;padding:.4rem;text-align:left}\
.cards{display:grid;grid-template-columns:repeat(auto-fill,minmax(200px,1fr));gap:1rem}\
.card{border:1px solid #ddd;padding:.75rem;border-radius:4px}.card img{max-width:100%}\
label{display:block;margin:.5rem 0}";

fn layout(title: &str, flash: Option<&str>, body: &str) -> String {
    let flash_html = flash
        .map(|msg| format!("<div class=\"flash\">{}</div>", text(msg)))
        .unwrap_or_default();

    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
<nav><a href=\"/\">New scrape</a><a href=\"/history\">History</a></nav>\n\
{flash_html}\n{body}\n</body>\n</html>\n",
        title = text(title),
    )
}

pub fn index_page(flash: Option<&str>) -> String {
    let body = "<h1>Shopee product scrape</h1>\n\
<form method=\"post\" action=\"/scrape\">\n\
<label>Keyword <input type=\"text\" name=\"keyword\" value=\"\" required></label>\n\
<label>Pages (0 = default) <input type=\"number\" name=\"numpage\" value=\"0\" min=\"0\"></label>\n\
<label>Items per page (0 = default) <input type=\"number\" name=\"itemperpage\" value=\"0\" min=\"0\"></label>\n\
<button type=\"submit\">Scrape</button>\n\
</form>";
    layout("Shopee scraper", flash, body)
}

pub fn results_page(result: &Value, download_filename: &str, flash: Option<&str>) -> String {
    let keyword = result.get("keyword").and_then(Value::as_str).unwrap_or("Unknown");
    let created_at = result.get("createdAt").and_then(Value::as_str).unwrap_or("N/A");
    let items: &[Value] = result
        .get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let cards: String = items.iter().map(product_card).collect();
    let link = urlencoding::encode(download_filename);

    let body = format!(
        "<h1>Results for &ldquo;{keyword}&rdquo;</h1>\n\
<p>{count} items &middot; created {created}</p>\n\
<p><a href=\"/downloads/{link}\">Download {file}</a></p>\n\
<input type=\"search\" id=\"productFilter\" placeholder=\"Filter products\">\n\
<p id=\"noFilterResults\" style=\"display:none\">No products match the filter.</p>\n\
<div class=\"cards\">\n{cards}</div>\n\
<script src=\"/static/filter.js\"></script>",
        keyword = text(keyword),
        count = items.len(),
        created = text(created_at),
        file = text(download_filename),
    );
    layout(&format!("Results: {keyword}"), flash, &body)
}

fn product_card(item: &Value) -> String {
    let field = |keys: &[&str]| -> Option<String> {
        keys.iter().find_map(|key| match item.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };

    let Some(name) = field(&["name", "title"]) else {
        // Not a recognisable product record; show it raw.
        return format!(
            "<div class=\"card\" data-product-name=\"\" data-product-desc=\"{raw}\"><pre>{raw_text}</pre></div>\n",
            raw = attr(&item.to_string()),
            raw_text = text(&item.to_string()),
        );
    };
    let description = field(&["description", "desc"]).unwrap_or_default();

    let mut card = format!(
        "<div class=\"card\" data-product-name=\"{}\" data-product-desc=\"{}\">",
        attr(&name),
        attr(&description)
    );
    if let Some(image) = field(&["image", "img"]) {
        card.push_str(&format!("<img src=\"{}\" alt=\"\" loading=\"lazy\">", attr(&image)));
    }
    match field(&["url", "link"]) {
        Some(url) => card.push_str(&format!("<h3><a href=\"{}\">{}</a></h3>", attr(&url), text(&name))),
        None => card.push_str(&format!("<h3>{}</h3>", text(&name))),
    }
    for (label, keys) in [("Price", &["price"][..]), ("Sold", &["sold"][..]), ("Location", &["location"][..])] {
        if let Some(value) = field(keys) {
            card.push_str(&format!("<p>{}: {}</p>", label, text(&value)));
        }
    }
    if !description.is_empty() {
        card.push_str(&format!("<p>{}</p>", text(&description)));
    }
    card.push_str("</div>\n");
    card
}

pub fn history_page(files: &[ResultFileSummary], flash: Option<&str>) -> String {
    let body = if files.is_empty() {
        "<h1>History</h1>\n<p>No results yet.</p>".to_string()
    } else {
        let rows: String = files
            .iter()
            .map(|f| {
                let link = urlencoding::encode(&f.filename);
                format!(
                    "<tr><td>{file}</td><td>{keyword}</td><td>{count}</td><td>{created}</td>\
<td><a href=\"/results/{link}\">View</a> <a href=\"/downloads/{link}\">Download</a></td></tr>\n",
                    file = text(&f.filename),
                    keyword = text(&f.keyword),
                    count = f.item_count,
                    created = text(&f.created_at),
                )
            })
            .collect();
        format!(
            "<h1>History</h1>\n<table>\n<thead><tr><th>File</th><th>Keyword</th><th>Items</th>\
<th>Created</th><th></th></tr></thead>\n<tbody>\n{rows}</tbody>\n</table>"
        )
    };
    layout("Scrape history", flash, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flash_and_keyword_are_escaped() {
        let page = results_page(
            &json!({ "keyword": "<script>", "data": [] }),
            "shopee_x_1.json",
            Some("a & b"),
        );
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("&ldquo;<script>"));
        assert!(page.contains("a &amp; b"));
    }

    #[test]
    fn cards_carry_filter_attributes() {
        let page = results_page(
            &json!({ "keyword": "bag", "data": [
                { "name": "Tote \"Big\"", "description": "canvas", "price": "10", "url": "https://x/1" },
                42
            ] }),
            "f.json",
            None,
        );
        assert!(page.contains("data-product-name=\"Tote &quot;Big&quot;\""));
        assert!(page.contains("data-product-desc=\"canvas\""));
        assert!(page.contains("<p>Price: 10</p>"));
        assert!(page.contains("<pre>42</pre>"));
        assert!(page.contains("2 items"));
    }

    #[test]
    fn empty_history_says_so() {
        assert!(history_page(&[], None).contains("No results yet."));
    }

    #[test]
    fn history_links_are_url_encoded() {
        let files = vec![ResultFileSummary {
            filename: "shopee_a b_1.json".into(),
            keyword: "a b".into(),
            item_count: 2,
            created_at: "N/A".into(),
        }];
        let page = history_page(&files, None);
        assert!(page.contains("/results/shopee_a%20b_1.json"));
        assert!(page.contains("<td>2</td>"));
    }
}
