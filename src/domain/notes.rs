//! Note edits are computed as a complete new list; the caller commits the
//! result wholesale.

fn normalized_text(text: &str) -> Result<String, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("note text must not be empty".to_string());
    }
    Ok(trimmed.to_string())
}

fn ensure_index(notes: &[String], index: usize) -> Result<(), String> {
    if index >= notes.len() {
        return Err(format!(
            "note index {index} is out of range for {} notes",
            notes.len()
        ));
    }
    Ok(())
}

pub fn append_note(notes: &[String], text: &str) -> Result<Vec<String>, String> {
    let text = normalized_text(text)?;
    let mut updated = notes.to_vec();
    updated.push(text);
    Ok(updated)
}

pub fn replace_note(notes: &[String], index: usize, text: &str) -> Result<Vec<String>, String> {
    ensure_index(notes, index)?;
    let text = normalized_text(text)?;
    let mut updated = notes.to_vec();
    updated[index] = text;
    Ok(updated)
}

pub fn remove_note(notes: &[String], index: usize) -> Result<Vec<String>, String> {
    ensure_index(notes, index)?;
    let mut updated = notes.to_vec();
    updated.remove(index);
    Ok(updated)
}
