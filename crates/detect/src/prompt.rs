/// Builds the (system, user) prompt pair for the detector call (§4.4 step
/// 1): `immediateContext` is the uncommented buffer's window,
/// `broadContext` is the last 1,500 chars of the full context, and
/// `content` is the triggering turn's own text.
pub fn build_prompt(immediate_context: &str, full_context: &str, content: &str) -> (String, String) {
    let broad_context = tail_chars(full_context, 1500);

    let system_prompt = "You analyze a live conversation transcript and detect noteworthy moments. \
        Respond with strict JSON matching: {\"events\": [{\"type\": one of emotion_peak | \
        topic_change | question_raised | conclusion_reached | key_point | climax_moment | \
        summary_point, \"confidence\": 0..1, \"intensity\": 0..1, \"triggers\": [string], \
        \"reasoning\": string, \"content_quality_score\": 0..10}], \"context_language\": string}. \
        Return no prose outside the JSON object."
        .to_string();

    let user_prompt = format!(
        "Broad context (earlier conversation):\n{broad_context}\n\n\
         Immediate context (not yet commented on):\n{immediate_context}\n\n\
         Latest turn:\n{content}"
    );

    (system_prompt, user_prompt)
}

fn tail_chars(s: &str, max_chars: usize) -> &str {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        return s;
    }
    let skip = char_count - max_chars;
    let byte_offset = s.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0);
    &s[byte_offset..]
}
