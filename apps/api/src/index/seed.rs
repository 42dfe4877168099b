//! Mock resume generator used to populate a demo index.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::profile::ProfileMetadata;

const SKILLS: &[&str] = &[
    "Python",
    "Java",
    "SQL",
    "AWS",
    "Azure",
    "GCP",
    "Machine Learning",
    "Data Analysis",
    "Project Management",
    "Marketing Strategy",
    "Sales Leadership",
    "Financial Modeling",
    "HR Management",
    "Product Management",
    "UI/UX Design",
    "Backend Development",
    "Frontend Development",
    "DevOps",
    "Cybersecurity",
    "Blockchain",
    "Salesforce CRM",
    "SAP ERP",
];

const ROLES: &[&str] = &[
    "Software Engineer",
    "Data Scientist",
    "Product Manager",
    "Marketing Manager",
    "Sales Executive",
    "HR Business Partner",
    "Financial Analyst",
    "UX Designer",
    "DevOps Engineer",
    "Business Analyst",
    "Technical Lead",
    "Director of Engineering",
    "VP of Sales",
];

const INDUSTRIES: &[&str] = &[
    "Tech",
    "Finance",
    "Healthcare",
    "Retail",
    "SaaS",
    "Biotech",
    "Manufacturing",
    "E-commerce",
    "Consulting",
    "Automotive",
];

const LEVELS: &[&str] = &["Junior", "Mid", "Senior", "Lead", "Manager", "Director", "VP"];

const DEGREES: &[&str] = &[
    "Computer Science",
    "Business Administration",
    "Marketing",
    "Finance",
    "Engineering",
];

/// A synthetic resume. Archived as-is and indexed via its `raw_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockResume {
    pub id: String,
    pub name: String,
    pub job_title: String,
    pub industry: String,
    pub level: String,
    pub skills: Vec<String>,
    pub raw_text: String,
}

impl MockResume {
    pub fn metadata(&self) -> ProfileMetadata {
        ProfileMetadata {
            name: self.name.clone(),
            job_title: self.job_title.clone(),
            level: self.level.clone(),
            industry: self.industry.clone(),
            skills: self.skills.clone(),
        }
    }
}

fn pick<R: Rng>(rng: &mut R, options: &[&'static str]) -> &'static str {
    options.choose(rng).copied().unwrap_or("N/A")
}

fn track_record(job_title: &str) -> &'static str {
    if job_title.contains("Sales") {
        "driving revenue growth"
    } else if job_title.contains("Engineer") {
        "building scalable systems"
    } else if job_title.contains("Manager") {
        "leading cross-functional teams"
    } else {
        "analyzing complex data"
    }
}

/// Generates `count` synthetic resumes numbered from 1.
pub fn generate_mock_resumes<R: Rng>(count: usize, rng: &mut R) -> Vec<MockResume> {
    (0..count).map(|i| generate_one(i, rng)).collect()
}

fn generate_one<R: Rng>(i: usize, rng: &mut R) -> MockResume {
    let number = i + 1;
    let name = format!("Candidate {number} from GlobalSolutions Inc.");
    let job_title = pick(rng, ROLES);
    let industry = pick(rng, INDUSTRIES);
    let level = pick(rng, LEVELS);

    let skill_count = rng.gen_range(3..=8);
    let skills: Vec<String> = SKILLS
        .choose_multiple(rng, skill_count)
        .map(|s| s.to_string())
        .collect();
    let skills_joined = skills.join(", ");

    let years = rng.gen_range(2..=15);
    let current_tenure = rng.gen_range(1..years);
    let projects = rng.gen_range(1..=3);
    let efficiency = rng.gen_range(10..=40);
    let releases = rng.gen_range(2..=5);
    let prior_tenure = rng.gen_range(1..=3);
    let prior_level = pick(rng, &["Junior", "Associate"]);
    let featured_skill = skills.choose(rng).cloned().unwrap_or_default();
    let analysis_skill = skills.choose(rng).cloned().unwrap_or_default();
    let degree = pick(rng, DEGREES);
    let short_title = job_title.rsplit(' ').next().unwrap_or(job_title);

    let raw_text = format!(
        "Name: {name}\n\
         Email: candidate.{number}@example.com | Phone: (123) 555-{i:04}\n\n\
         **Summary:** A results-oriented and experienced {level} {job_title} with {years} years in the {industry} industry. \
         Skilled in {skills_joined}. Adept at {track}.\n\n\
         **Experience:**\n\
         **Acme Corp** - {job_title} ({current_tenure} years)\n\
         \x20\x20- Led {projects} major projects, improving efficiency by {efficiency}%.\n\
         \x20\x20- Mentored junior team members and fostered a collaborative environment.\n\
         \x20\x20- Developed and deployed X, Y, and Z features using {featured_skill}.\n\
         **Global Innovations** - {prior_level} {short_title} ({prior_tenure} years)\n\
         \x20\x20- Contributed to {releases} product releases.\n\
         \x20\x20- Performed data analysis using {analysis_skill}.\n\n\
         **Education:** Bachelor's Degree in {degree} from a well-regarded university.",
        track = track_record(job_title),
    );

    MockResume {
        id: uuid::Builder::from_random_bytes(rng.gen()).into_uuid().to_string(),
        name,
        job_title: job_title.to_string(),
        industry: industry.to_string(),
        level: level.to_string(),
        skills,
        raw_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_generates_requested_count_with_unique_ids() {
        let resumes = generate_mock_resumes(50, &mut StdRng::seed_from_u64(7));
        assert_eq!(resumes.len(), 50);
        let ids: HashSet<&str> = resumes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 50);
        assert!(resumes.iter().all(|r| uuid::Uuid::parse_str(&r.id).is_ok()));
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let a = generate_mock_resumes(5, &mut StdRng::seed_from_u64(42));
        let b = generate_mock_resumes(5, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_resume_fields_are_consistent() {
        for resume in generate_mock_resumes(20, &mut StdRng::seed_from_u64(1)) {
            assert!((3..=8).contains(&resume.skills.len()));
            let distinct: HashSet<&String> = resume.skills.iter().collect();
            assert_eq!(distinct.len(), resume.skills.len());
            assert!(resume.raw_text.contains(&resume.name));
            assert!(resume.raw_text.contains(&resume.job_title));
            assert!(ROLES.contains(&resume.job_title.as_str()));
            assert!(LEVELS.contains(&resume.level.as_str()));
        }
    }

    #[test]
    fn test_numbering_starts_at_one() {
        let resumes = generate_mock_resumes(2, &mut StdRng::seed_from_u64(3));
        assert_eq!(resumes[0].name, "Candidate 1 from GlobalSolutions Inc.");
        assert!(resumes[1].raw_text.contains("candidate.2@example.com"));
    }

    #[test]
    fn test_track_record_by_title() {
        assert_eq!(track_record("VP of Sales"), "driving revenue growth");
        assert_eq!(track_record("DevOps Engineer"), "building scalable systems");
        assert_eq!(track_record("Product Manager"), "leading cross-functional teams");
        assert_eq!(track_record("Financial Analyst"), "analyzing complex data");
    }

    #[test]
    fn test_metadata_mirrors_resume() {
        let resume = generate_mock_resumes(1, &mut StdRng::seed_from_u64(9)).remove(0);
        let metadata = resume.metadata();
        assert_eq!(metadata.name, resume.name);
        assert_eq!(metadata.skills, resume.skills);
    }
}
