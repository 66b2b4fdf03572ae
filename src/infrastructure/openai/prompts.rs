pub fn story_system_prompt(style: &str, character_names: &[String], num_panels: u32) -> String {
    let character_prompt = if character_names.is_empty() {
        String::new()
    } else {
        format!("Include these characters: {}. ", character_names.join(", "))
    };

    format!(
        "Create a short, engaging children's story in the style of {style}. \
         The story should be appropriate for children, with a clear beginning, middle, and end. \
         {character_prompt}\
         Keep it concise yet engaging, suitable for a {num_panels} panel comic book."
    )
}

pub fn panel_breakdown_prompt(num_panels: u32) -> String {
    format!(
        "Break down this story into exactly {num_panels} sequential panels for a comic book. \
         For each panel, provide: 1) A description of what should be shown in the image, and \
         2) The text/dialogue that should appear in the panel. \
         Respond with a JSON object of the form \
         {{\"panels\": [{{\"image_description\": \"...\", \"panel_text\": \"...\"}}]}}."
    )
}

pub fn panel_image_prompt(description: &str) -> String {
    format!(
        "Create pixel art for a children's comic: {description}. \
         Use bright colors, simple shapes, and a pixelated style. \
         Make it cute and child-friendly."
    )
}
