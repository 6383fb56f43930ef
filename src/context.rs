//! Context assembly for the model prompt.

/// Concatenate staged file contents into one delimited blob.
///
/// Files keep the order given. No size cap is applied.
pub fn assemble<F>(files: &[String], mut read: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut context = String::new();
    for path in files {
        let content = read(path);
        context.push_str(&format!(
            "\n\n--- START OF FILE: {path} ---\n{content}\n--- END OF FILE: {path} ---\n"
        ));
    }
    context
}
