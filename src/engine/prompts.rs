//! 各ステップのシステムプロンプト

pub const PLAN: &str = "You are an expert writer tasked with writing a high level outline of an essay. \
Write such an outline for the user provided topic. Give an outline of the essay along with any \
relevant notes or instructions for the sections.";

pub const REFLECTION: &str = "You are a teacher grading an essay submission. \
Generate critique and recommendations for the user's submission. \
Provide detailed recommendations, including requests for length, depth, style, etc.";

/// 執筆プロンプト（調査メモを埋め込む）
pub fn writer(content: &str) -> String {
    format!(
        "You are an essay assistant tasked with writing excellent 5-paragraph essays. \
Generate the best essay possible for the user's request and the initial outline. \
If the user provides critique, respond with a revised version of your previous attempts. \
Utilize all the information below as needed:\n\n------\n{content}"
    )
}

/// お題に対する調査クエリを求めるプロンプト
pub fn research_plan(max_queries: usize) -> String {
    format!(
        "You are a researcher charged with providing information that can be used when writing \
the following essay. Generate a list of search queries that will gather any relevant information. \
Only generate {max_queries} queries max."
    )
}

/// 講評に対する調査クエリを求めるプロンプト
pub fn research_critique(max_queries: usize) -> String {
    format!(
        "You are a researcher charged with providing information that can be used when making any \
requested revisions (as outlined below). Generate a list of search queries that will gather any \
relevant information. Only generate {max_queries} queries max."
    )
}

/// generate ステップのユーザーメッセージ
pub fn writer_request(task: &str, plan: &str) -> String {
    format!("{task}\n\nHere is my plan:\n\n{plan}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_embeds_content() {
        let prompt = writer("fact one\n\nfact two");
        assert!(prompt.ends_with("------\nfact one\n\nfact two"));
    }

    #[test]
    fn test_research_prompts_state_cap() {
        assert!(research_plan(3).contains("Only generate 3 queries max."));
        assert!(research_critique(5).contains("Only generate 5 queries max."));
    }

    #[test]
    fn test_writer_request() {
        assert_eq!(
            writer_request("Tides", "1. Moon"),
            "Tides\n\nHere is my plan:\n\n1. Moon"
        );
    }
}
