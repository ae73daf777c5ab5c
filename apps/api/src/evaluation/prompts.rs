// Prompt constants for transcript scoring.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for the rubric call.
pub const RUBRIC_SYSTEM: &str = "You are an expert interview evaluator. \
    You score job interviews fairly and objectively against a fixed rubric. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Rubric prompt. Replace `{job_title}`, `{experience_level}`, `{skills}`,
/// `{candidate_name}`, `{experience}`, `{evidence_instruction}` and, last, `{transcript}`.
pub const RUBRIC_PROMPT_TEMPLATE: &str = r#"Analyze the following interview and provide a detailed evaluation.

**Job Details:**
- Position: {job_title}
- Experience Level: {experience_level}
- Required Skills: {skills}

**Candidate:**
- Name: {candidate_name}
- Experience: {experience}

Return a JSON object with this EXACT schema:
{
  "overall_score": 7.5,
  "technical_score": 7.0,
  "communication_score": 8.0,
  "cultural_fit_score": 7.0,
  "behavioral_score": 7.5,
  "strengths": ["specific strength shown in the transcript"],
  "weaknesses": ["specific weakness shown in the transcript"],
  "red_flags": [],
  "recommendation": "hire",
  "interview_quality": 7,
  "technical_depth": 6,
  "behavioral_analysis": {
    "confidence_level": "high",
    "engagement": "medium",
    "clarity": "high"
  },
  "skill_assessment": {
    "relevant_skills_demonstrated": ["skill"],
    "missing_skills": ["skill"]
  },
  "ai_feedback": {
    "summary": "2-3 sentence overall assessment",
    "hiring_justification": "1-2 sentence justification for the recommendation"
  }
}

Rules:
- Every score is a number from 1 to 10; interview_quality and technical_depth are integers from 1 to 10.
- recommendation is exactly one of: "hire", "reject", "maybe", "second_round".
- confidence_level, engagement and clarity are each "high", "medium" or "low".

Score guidelines:
- 8-10: Excellent candidate, strong hire
- 6-7: Good candidate, potential hire
- 4-5: Average, needs further evaluation
- 1-3: Below expectations, likely reject

{evidence_instruction}
Score ONLY what the candidate actually said.

**Interview Transcript:**
{transcript}"#;
