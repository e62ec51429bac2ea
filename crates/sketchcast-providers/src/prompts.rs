//! Whiteboard illustration prompts and the per-job label plan.

use serde::{Deserialize, Serialize};

use sketchcast_models::JobId;

/// Words that mark a sentence as depicting people.
const PEOPLE_KEYWORDS: &[&str] = &[
    "person", "people", "man", "woman", "boy", "girl", "teacher", "student", "child",
    "children", "adult", "men", "women", "kid", "kids", "human", "face", "worker", "employee",
    "boss", "manager", "team", "group", "crowd", "audience", "speaker", "presenter", "doctor",
    "nurse", "patient", "customer", "client", "user", "friend", "family", "parent", "father",
    "mother", "son", "daughter", "brother", "sister",
];

const MONOCHROME_SUFFIX: &str = " IMPORTANT: Generate ONLY in black and white sketch style - \
no colors, just black lines on white background.";

/// Most frames per job allowed to carry handwritten labels.
pub const MAX_LABEL_FRAMES: usize = 2;

/// Whether the sentence mentions people, matched on whole words.
pub fn involves_people(sentence: &str) -> bool {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|word| {
            let word = word.to_lowercase();
            PEOPLE_KEYWORDS.contains(&word.as_str())
        })
}

/// Build the illustration prompt for one sentence.
pub fn sketch_prompt(sentence: &str, with_labels: bool) -> String {
    let subject = sentence
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .to_lowercase();

    let mut prompt = format!(
        "whiteboard sketch style illustration of {}, hand-drawn, educational, clean, simple",
        subject
    );

    if with_labels {
        prompt.push_str(", with 1-2 short handwritten labels for key terms, no heading or title");
    } else {
        prompt.push_str(", no text, only visual elements");
    }

    if involves_people(sentence) {
        prompt.push_str(
            ". Include 1-2 simple, friendly human figures with clear expressions and natural \
             gestures, keeping the focus on the concept being explained",
        );
    }

    prompt.push('.');
    prompt.push_str(MONOCHROME_SUFFIX);
    prompt
}

/// Sentence indices whose illustration may carry handwritten labels.
///
/// Chosen once per job from the job identifier, so the same job always gets
/// the same plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPlan {
    indices: Vec<usize>,
}

impl LabelPlan {
    /// A plan that labels nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn for_job(job_id: &JobId, sentence_count: usize) -> Self {
        if sentence_count == 0 {
            return Self::none();
        }

        let hash = fnv1a(job_id.as_str().as_bytes());
        let wanted = (1 + (hash % MAX_LABEL_FRAMES as u64) as usize).min(sentence_count);

        let first = ((hash >> 8) % sentence_count as u64) as usize;
        let mut indices = vec![first];
        if wanted > 1 {
            let step = 1 + ((hash >> 24) % (sentence_count as u64 - 1)) as usize;
            indices.push((first + step) % sentence_count);
        }
        indices.sort_unstable();

        Self { indices }
    }

    pub fn allows(&self, sentence_index: usize) -> bool {
        self.indices.contains(&sentence_index)
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_involves_people_matches_whole_words() {
        assert!(involves_people("A teacher explains recursion."));
        assert!(involves_people("Each user clicks the button"));
        assert!(!involves_people("Many arrays store data."));
        assert!(!involves_people("The manifest lists files."));
    }

    #[test]
    fn test_prompt_without_labels() {
        let prompt = sketch_prompt("Arrays store data.", false);
        assert!(prompt.starts_with("whiteboard sketch style illustration of arrays store data,"));
        assert!(prompt.contains("no text, only visual elements"));
        assert!(prompt.ends_with("just black lines on white background."));
        assert!(!prompt.contains("human figures"));
    }

    #[test]
    fn test_prompt_with_labels_and_people() {
        let prompt = sketch_prompt("The student sorts a list!", true);
        assert!(prompt.contains("handwritten labels"));
        assert!(!prompt.contains("no text"));
        assert!(prompt.contains("human figures"));
    }

    #[test]
    fn test_label_plan_is_deterministic_and_bounded() {
        let job = JobId::from_string("5d0c3c5e-1f0e-4a43-9d1e-6b0d2b4b8a11");
        let a = LabelPlan::for_job(&job, 7);
        let b = LabelPlan::for_job(&job, 7);
        assert_eq!(a, b);
        assert!(!a.indices().is_empty());
        assert!(a.indices().len() <= MAX_LABEL_FRAMES);
        assert!(a.indices().iter().all(|&i| i < 7));
        assert!(a.indices().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_label_plan_small_jobs() {
        assert_eq!(LabelPlan::for_job(&JobId::from_string("x"), 0), LabelPlan::none());
        let single = LabelPlan::for_job(&JobId::from_string("x"), 1);
        assert_eq!(single.indices(), &[0]);
        assert!(single.allows(0));
        assert!(!single.allows(1));
    }

    #[test]
    fn test_label_plan_varies_across_jobs() {
        let plans: std::collections::HashSet<Vec<usize>> = (0..32)
            .map(|i| {
                LabelPlan::for_job(&JobId::from_string(format!("job-{}", i)), 10)
                    .indices()
                    .to_vec()
            })
            .collect();
        assert!(plans.len() > 1);
    }
}
