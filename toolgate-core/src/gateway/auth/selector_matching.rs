/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Evaluation of group selectors against normalized tools.

use toolgate_store::model::SelectorKind;
use toolgate_store::model::ToolDocument;
use toolgate_store::model::ToolSelector;

/// Return `true` if the selector matches the tool.
///
/// `tag` and `label` selectors match when any of the tool's tags matches.
pub fn selector_matches(selector: &ToolSelector, tool: &ToolDocument) -> bool {
    match selector.kind {
        SelectorKind::Name => pattern_matches(&selector.pattern, &tool.operation_id),
        SelectorKind::Method => pattern_matches(&selector.pattern, &tool.http_method),
        SelectorKind::Path => pattern_matches(&selector.pattern, &tool.path_template),
        SelectorKind::Tag | SelectorKind::Label => tool
            .tags
            .iter()
            .any(|tag| pattern_matches(&selector.pattern, tag)),
        SelectorKind::Source => pattern_matches(&selector.pattern, &tool.source_id),
    }
}

/// Match a selector pattern against a value, case-insensitively.
///
/// Patterns prefixed with `regex:` are regular expressions; everything else
/// is a glob where `*` matches any run and `?` a single character.
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    let expression = pattern
        .strip_prefix("regex:")
        .map(str::to_owned)
        .unwrap_or_else(|| glob_to_regex(pattern));
    regex::RegexBuilder::new(&expression)
        .case_insensitive(true)
        .build()
        .map(|compiled| compiled.is_match(value))
        .unwrap_or_else(|e| {
            log::warn!("Skipping selector with invalid pattern '{pattern}': {e}");
            false
        })
}

/// Compile a glob into an anchored regular expression.
fn glob_to_regex(glob: &str) -> String {
    let mut expression = String::with_capacity(glob.len() + 8);
    expression.push('^');
    for character in glob.chars() {
        match character {
            '*' => expression.push_str(".*"),
            '?' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');
    expression
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn star_matches_everything() {
        assert!(pattern_matches("*", ""));
        assert!(pattern_matches("*", "anything/at-all"));
    }

    #[test]
    fn globs_are_anchored_and_case_insensitive() {
        assert!(pattern_matches("get_*", "GET_menu_items"));
        assert!(!pattern_matches("get_*", "forget_menu"));
        assert!(pattern_matches("get_?enu", "get_menu"));
        assert!(!pattern_matches("get_?enu", "get_mmenu"));
    }

    #[test]
    fn glob_escapes_regex_metacharacters() {
        assert!(pattern_matches("/api/menu", "/api/menu"));
        assert!(!pattern_matches("/api/menu", "/apiXmenu"));
        assert!(pattern_matches("/api/{item_id}", "/api/{item_id}"));
    }

    #[test]
    fn regex_prefix_switches_to_regex() {
        assert!(pattern_matches("regex:^$", ""));
        assert!(!pattern_matches("regex:^$", "x"));
        assert!(pattern_matches("regex:^get_.*_items$", "get_menu_items"));
    }

    #[test]
    fn tag_selector_matches_any_tag() {
        let tool = ToolDocument {
            tool_id: "s1/get_menu".to_owned(),
            source_id: "s1".to_owned(),
            operation_id: "get_menu".to_owned(),
            http_method: "GET".to_owned(),
            path_template: "/api/menu".to_owned(),
            summary: None,
            tags: vec!["menu".to_owned(), "public".to_owned()],
            parameters: vec![],
            request_body_schema: None,
            response_schemas: Default::default(),
            enabled: true,
            state_version: 1,
        };
        assert!(selector_matches(
            &ToolSelector {
                kind: SelectorKind::Tag,
                pattern: "menu".to_owned(),
            },
            &tool
        ));
        assert!(!selector_matches(
            &ToolSelector {
                kind: SelectorKind::Tag,
                pattern: "orders".to_owned(),
            },
            &tool
        ));
    }
}
