//! Rendering topic words into readable labels

/// Join words into an English list phrase.
///
/// One word is returned unchanged, two become `"a and b"`, three become
/// `"a, b, and c"`; longer lists are joined with spaces.
pub fn join_phrase<S: AsRef<str>>(words: &[S]) -> String {
    match words {
        [] => String::new(),
        [one] => one.as_ref().to_string(),
        [a, b] => format!("{} and {}", a.as_ref(), b.as_ref()),
        [a, b, c] => format!("{}, {}, and {}", a.as_ref(), b.as_ref(), c.as_ref()),
        many => many
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Label for a topic: each word title-cased with `_` read as a space, then
/// joined by [`join_phrase`]
pub fn make_topic_label<S: AsRef<str>>(words: &[S]) -> String {
    let cleaned: Vec<String> = words
        .iter()
        .map(|word| title_case(word.as_ref().replace('_', " ").trim()))
        .collect();
    join_phrase(&cleaned)
}

/// `"word(0.12), other(0.08)"`
pub fn format_terms(terms: &[(String, f32)]) -> String {
    terms
        .iter()
        .map(|(word, score)| format!("{}({:.2})", word, score))
        .collect::<Vec<_>>()
        .join(", ")
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_phrase() {
        assert_eq!(join_phrase::<&str>(&[]), "");
        assert_eq!(join_phrase(&["battery"]), "battery");
        assert_eq!(join_phrase(&["X", "Y"]), "X and Y");
        assert_eq!(join_phrase(&["X", "Y", "Z"]), "X, Y, and Z");
        assert_eq!(join_phrase(&["a", "b", "c", "d"]), "a b c d");
    }

    #[test]
    fn test_make_topic_label() {
        assert_eq!(make_topic_label(&["battery_life"]), "Battery Life");
        assert_eq!(make_topic_label(&["camera", "screen"]), "Camera and Screen");
        assert_eq!(
            make_topic_label(&["battery", "charger", "fast charging"]),
            "Battery, Charger, and Fast Charging"
        );
    }

    #[test]
    fn test_format_terms() {
        let terms = vec![("battery".to_string(), 0.1234), ("screen".to_string(), 0.05)];
        assert_eq!(format_terms(&terms), "battery(0.12), screen(0.05)");
    }
}
