use serde::Serialize;

use crate::cli::OutputFormat;

/// Render a response in the requested format.
///
/// `text` supplies the human rendering; it is only called for
/// [`OutputFormat::Text`].
pub fn render<T: Serialize>(
    value: &T,
    format: OutputFormat,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
        OutputFormat::Text => Ok(text(value)),
    }
}

/// Print a response in the requested format.
pub fn output<T: Serialize>(
    value: &T,
    format: OutputFormat,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    let rendered = render(value, format, text)?;
    println!("{}", rendered.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::render;
    use crate::cli::OutputFormat;

    #[derive(Serialize)]
    struct Sample {
        name: &'static str,
        count: u32,
    }

    const SAMPLE: Sample = Sample { name: "origin", count: 3 };

    #[test]
    fn json_is_pretty_and_raw_is_compact() {
        let pretty = render(&SAMPLE, OutputFormat::Json, |_| String::new()).unwrap();
        assert!(pretty.contains("\n  \"name\": \"origin\""));

        let raw = render(&SAMPLE, OutputFormat::Raw, |_| String::new()).unwrap();
        assert_eq!(raw, r#"{"name":"origin","count":3}"#);
    }

    #[test]
    fn text_uses_the_caller_rendering() {
        let text = render(&SAMPLE, OutputFormat::Text, |s| format!("{}={}", s.name, s.count)).unwrap();
        assert_eq!(text, "origin=3");
    }
}
