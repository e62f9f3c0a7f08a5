//! Demo catalog served by `GET /api/sample-problems`.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleProblem {
    pub id: u32,
    pub difficulty: &'static str,
    pub problem: &'static str,
    pub correct_answer: &'static str,
    /// Why the single small model tends to miss it.
    pub why_single_fails: &'static str,
}

pub const SAMPLE_PROBLEMS: [SampleProblem; 5] = [
    SampleProblem {
        id: 1,
        difficulty: "medium",
        problem: "A meal costs €97. You pay €100, get €3 back, and tip €2. But your spending is confusingly calculated. What’s the real expense?",
        correct_answer: "10",
        why_single_fails: "Small model struggles with tracking sequential operations correctly",
    },
    SampleProblem {
        id: 2,
        difficulty: "hard",
        problem: "A train travels from City A to City B at 60 mph. The return journey from City B to City A takes 3 hours at 80 mph. What is the total distance of the round trip?",
        correct_answer: "480 miles",
        why_single_fails: "Small model struggles with relationships between speed, time, and distance across multiple steps",
    },
    SampleProblem {
        id: 3,
        difficulty: "medium",
        problem: "Tom has twice as many marbles as Jerry. Jerry has 5 more marbles than Bobby. If Bobby has 8 marbles, how many marbles do Tom, Jerry, and Bobby have in total?",
        correct_answer: "47",
        why_single_fails: "Small model doesn't handle transitive relationships well",
    },
    SampleProblem {
        id: 4,
        difficulty: "hard",
        problem: "A rectangular garden is 3 times as long as it is wide. If the perimeter is 96 meters, what is the area of the garden?",
        correct_answer: "432 square meters",
        why_single_fails: "Small model may struggle with setting up algebraic relationships",
    },
    SampleProblem {
        id: 5,
        difficulty: "hard",
        problem: "A stock price starts at $50. On Monday it increases by 20%. On Tuesday it decreases by 15%. On Wednesday it increases by 10%. What is the final stock price?",
        correct_answer: "$56.10",
        why_single_fails: "Small model compounds percentages incorrectly",
    },
];
