// Prompt text for each assistant operation.

use unishare_core::models::{Category, Listing};

/// Instructions sent alongside a 360-degree item video.
pub fn video_appraisal() -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| format!("\"{}\"", c.label()))
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        "Perform a visual technical appraisal of the engineering asset shown in this \
         360-degree rotation video for UniShare, a student marketplace.\n\
         \n\
         1. Identify the tool or hardware precisely.\n\
         2. Inspect every angle for physical flaws: scratches, rust, bent pins, cracks, wear, missing parts.\n\
         3. Grade it: A = mint, no visible faults; B = used, minor cosmetic wear; \
         C = functional with significant flaws or heavy wear.\n\
         4. Estimate a fair second-hand student price in INR.\n\
         5. Estimate the carbon saved (kg) by reusing it.\n\
         \n\
         Return ONLY a JSON object:\n\
         {{\"item_name\": string, \"category\": {categories}, \"quality_grade\": \"A\" | \"B\" | \"C\", \
         \"estimated_price\": number, \"carbonSaved\": number, \
         \"review\": {{\"specs\": [string], \"faults\": [string], \"grading_explanation\": string}}}}\n\
         \n\
         If the video does not clearly show an engineering asset, set item_name to \"None\"."
    )
}

pub fn damage_inspection() -> &'static str {
    "Inspect this tool for structural damage and assign grade A, B, or C. Respond ONLY with a \
     JSON object: {\"toolName\": string, \"qualityGrade\": \"A\" | \"B\" | \"C\", \
     \"condition\": \"Excellent\" | \"Good\" | \"Damaged\" | \"Critical\", \"score\": number (0-10), \
     \"findings\": [string], \"recommendation\": string}"
}

pub fn pdf_summary(title: &str) -> String {
    format!("Provide a 3-bullet summary of the study notes titled \"{title}\".")
}

pub fn support(query: &str) -> String {
    format!(
        "You are the UniShare campus marketplace help desk. Answer briefly.\n\
         Support query: {query}"
    )
}

/// Side-by-side comparison of two marketplace listings for a student buyer.
pub fn item_comparison(first: &Listing, second: &Listing) -> String {
    let describe = |l: &Listing| {
        format!(
            "{} ({}, {}, {} INR, {:?})",
            l.title,
            l.category.label(),
            l.condition,
            l.price,
            l.listing_type
        )
    };
    format!(
        "Compare {} and {} for a student deciding which to get. Keep it short.",
        describe(first),
        describe(second)
    )
}

pub fn claims_explanation(payload: &serde_json::Value) -> String {
    format!(
        "You are a web security professor. Explain these session token claims to a student. \
         Point out any sensitive information and what the standard claims iat, sub and iss mean.\n\
         Decoded payload: {payload}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appraisal_prompt_lists_every_category() {
        let p = video_appraisal();
        for c in Category::ALL {
            assert!(p.contains(c.label()), "missing {}", c.label());
        }
        assert!(p.contains("\"None\""));
    }

    #[test]
    fn prompts_embed_their_inputs() {
        assert!(pdf_summary("M3 Unit 2").contains("M3 Unit 2"));
        assert!(support("how do I rent?").ends_with("how do I rent?"));
        let payload = serde_json::json!({"sub": "u1"});
        assert!(claims_explanation(&payload).contains("\"sub\":\"u1\""));
    }

    #[test]
    fn comparison_names_both_items() {
        let seed = unishare_core::seed::listings();
        let p = item_comparison(&seed[0], &seed[1]);
        assert!(p.starts_with(&format!("Compare {} (", seed[0].title)));
        assert!(p.contains(&format!(" and {} (", seed[1].title)));
        assert!(p.contains(&seed[1].condition));
    }
}
