//! Prompt templates for drafting.
//!
//! Japanese articles get Japanese prompts; any other article language gets
//! English prompts that name the language to write in.

use chrono::{DateTime, Datelike, Local};

/// Prompt set for one article language.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prompts<'a> {
    Japanese,
    Other(&'a str),
}

impl<'a> Prompts<'a> {
    pub fn for_language(language: &'a str) -> Self {
        let lang = language.trim();
        if lang.eq_ignore_ascii_case("japanese") || lang.eq_ignore_ascii_case("ja") || lang == "日本語" {
            Prompts::Japanese
        } else {
            Prompts::Other(lang)
        }
    }

    pub fn system(&self, min: usize, target: usize) -> String {
        match self {
            Prompts::Japanese => format!(
                "あなたはAI技術の専門知識を持つ経験豊富なテックライターです。
以下の条件を厳密に守って記事を執筆してください：

【文字数について】
- 本文は必ず{min}字以上、{target}字程度にする（タイトルとタグは除く）
- 詳細で読み応えのある長文記事にする
- 具体的な事例、比較情報、実用的なアドバイスを豊富に含める
- 各セクションを詳しく掘り下げて解説する

【内容について】
- 最新のAI技術やサービスに関する情報を含める
- AIツールの比較や評価を具体的に行う
- 読者が実際に使える実用的な情報を提供する
- 最新機能や新機能について詳しく解説する
- 読者が興味を持つような内容（比較、実用例、メリット・デメリットなど）を含める
- 専門的でありながら、初心者にもわかりやすい説明をする

【ターゲット読者について】
- AIに興味がある一般ユーザーから技術者まで幅広い読者を想定
- 実際にAIツールを使いたい人、比較検討している人を主なターゲットとする
- 業界の動向を広く知りたい人

【記事のスタイル】
- 単なるニュースの羅列ではなく、それらが社会や個人の生活にどう影響するかを考察する
- 複数のニュースを関連付けて、大きなトレンドとして解説する
- 読者が「へぇ、そうなんだ」と思えるような深い洞察を含める

【構成について】
- 導入: 最新のAI技術やサービスの重要性を説明
- 最新動向: 最新ニュースや技術動向を紹介
- 詳細解説: 主要な機能や特徴を詳しく説明
- 比較・評価: 複数のツールやサービスを比較（該当する場合）
- 実用例: 実際の使用例や活用方法を紹介
- まとめ: 読者にとっての価値や今後の展望を提示

【形式について】
- HTML形式で出力する（段落は<p>タグで囲む）
- 見出しは<h2>タグを使用して構造化する
- 重要なポイントは<strong>タグで強調する
- 比較表やリストは<ul>や<ol>タグを使用する

【トーン】
- 専門的でありながら親しみやすい
- 最新技術への興奮や期待を伝える
- 実用的で役立つ情報を提供する

【出力フォーマット】
1行目: タイトル: [記事のタイトル]
2行目以降: [HTML形式の本文]"
            ),
            Prompts::Other(language) => format!(
                "You are an experienced technology writer with deep expertise in AI.
Write the article in {language} and follow these rules strictly.

[Length]
- The body must be at least {min} characters, around {target} characters, not counting the title or markup
- Make it detailed and substantial
- Include plenty of concrete examples, comparisons and practical advice
- Cover every section in depth

[Content]
- Include information about the latest AI technologies and services
- Compare and evaluate AI tools concretely
- Give readers practical information they can use right away
- Explain new and recently released features in detail
- Cover what readers care about: comparisons, use cases, pros and cons
- Stay expert but understandable for beginners

[Audience]
- Everyone from curious general users to engineers
- Mainly people who want to use AI tools or are choosing between them
- Readers who want to follow the industry broadly

[Style]
- Do not just list news; discuss how it affects society and daily life
- Connect several news items into a larger trend
- Offer insights that make readers stop and think

[Structure]
- Introduction: why the latest AI technology or service matters
- Latest trends: recent news and technology developments
- Deep dive: the main features and characteristics in detail
- Comparison: several tools or services side by side, where relevant
- Practical use: real usage examples and how to apply them
- Conclusion: the value for readers and the outlook ahead

[Markup]
- Output HTML, with paragraphs wrapped in <p> tags
- Use <h2> tags for section headings
- Emphasise key points with <strong> tags
- Use <ul> or <ol> tags for lists and comparisons

[Tone]
- Professional yet approachable
- Convey excitement about new technology
- Useful and practical

[Output format]
Line 1: Title: [article title]
Line 2 onward: [HTML body]"
            ),
        }
    }

    /// Block listing titles to steer away from; empty when there are none.
    fn avoid_block(&self, avoid: &[String]) -> String {
        if avoid.is_empty() {
            return String::new();
        }
        let titles = avoid.iter().map(|t| format!("- {t}")).collect::<Vec<_>>().join("\n");
        match self {
            Prompts::Japanese => {
                format!("\n以下のタイトルは既に公開済みです。明確に異なる題材とタイトルを選んでください：\n{titles}\n")
            }
            Prompts::Other(_) => format!(
                "\nThese titles were already published. Choose a clearly different subject and title:\n{titles}\n"
            ),
        }
    }

    pub fn digest(&self, digest: &str, avoid: &[String]) -> String {
        let avoid_block = self.avoid_block(avoid);
        match self {
            Prompts::Japanese => format!(
                "以下の最新AIニュースを基に、上記の条件を守って記事を書いてください：

【最新ニュース情報】
{digest}

【重要な指示】
- 上記の最新ニュースの中から、最も興味深いトピックを1つ選んで詳しく解説してください
- 他の記事と重複しないよう、ユニークな視点や切り口で書いてください
- 具体的な日付や最新の情報を含めて、「今日の最新情報」であることを明確にしてください
- AIツールの比較や評価を含めてください（該当する場合）
- 最新機能や新機能について詳しく解説してください
- 実用的な活用方法や使用例を含めてください
- 読者が「このツールを試してみたい」「比較して選びたい」と思える内容にしてください
{avoid_block}
記事を執筆してください。"
            ),
            Prompts::Other(_) => format!(
                "Write an article following the rules above, based on the latest AI news below.

[Latest news]
{digest}

[Important]
- Pick the single most interesting topic from the news above and cover it in depth
- Take a unique angle so the article does not repeat earlier posts
- Include concrete dates and current details so it is clearly today's news
- Compare and evaluate AI tools where relevant
- Explain new features in detail
- Include practical applications and usage examples
- Make readers want to try the tools or compare them before choosing
{avoid_block}
Write the article."
            ),
        }
    }

    pub fn topic(&self, topic: &str, now: DateTime<Local>, avoid: &[String]) -> String {
        let avoid_block = self.avoid_block(avoid);
        match self {
            Prompts::Japanese => {
                let as_of = format!("{}年{}月", now.year(), now.month());
                format!(
                    "以下のトピックについて、上記の条件を守って記事を書いてください：

トピック: {topic}

【重要な指示】
- このトピックに関連する最新のAI技術やサービスについて詳しく解説してください
- 他の記事と重複しないよう、ユニークな視点や切り口で書いてください
- {as_of}時点の最新情報を含めてください
- AIツールの比較や評価を含めてください（該当する場合）
- 最新機能や新機能について詳しく解説してください
- 実用的な活用方法や使用例を含めてください
- 読者が興味を持つような内容（比較、実用例、メリット・デメリットなど）を含めてください
{avoid_block}
記事を執筆してください。"
                )
            }
            Prompts::Other(_) => {
                let as_of = now.format("%B %Y");
                format!(
                    "Write an article following the rules above on this topic:

Topic: {topic}

[Important]
- Cover the latest AI technologies and services related to this topic in detail
- Take a unique angle so the article does not repeat earlier posts
- Include the most recent information available as of {as_of}
- Compare and evaluate AI tools where relevant
- Explain new features in detail
- Include practical applications and usage examples
- Cover what readers care about: comparisons, use cases, pros and cons
{avoid_block}
Write the article."
                )
            }
        }
    }

    /// User message for the length-repair pass.
    pub fn continuation(&self, existing: &str, needed: usize) -> String {
        match self {
            Prompts::Japanese => format!(
                "既存の記事:
{existing}

上記の記事の続きとして、さらに約{needed}字以上の内容を追加してください。
同じテーマで、以下の点を含めてください：
- 追加のAI技術情報や最新動向
- 実用的な活用方法や使用例（ステップバイステップで）
- 他のAIツールとの比較や評価
- 読者が実際に試せる具体的なアドバイス
- 今後の展望やトレンド
- さらなる実用的なヒントとコツ

HTML形式（<p>タグ、<h2>タグ、<strong>タグを使用）で出力してください。"
            ),
            Prompts::Other(_) => format!(
                "Existing article:
{existing}

Continue the article above with at least {needed} more characters on the same theme, covering:
- Additional AI technology information and recent developments
- Practical applications and usage examples, step by step
- Comparisons and evaluations against other AI tools
- Concrete advice readers can try themselves
- The outlook and upcoming trends
- More practical tips and tricks

Output HTML (use <p>, <h2> and <strong> tags)."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_language_selection() {
        assert_eq!(Prompts::for_language("Japanese"), Prompts::Japanese);
        assert_eq!(Prompts::for_language(" ja "), Prompts::Japanese);
        assert_eq!(Prompts::for_language("日本語"), Prompts::Japanese);
        assert_eq!(Prompts::for_language("English"), Prompts::Other("English"));
    }

    #[test]
    fn test_japanese_prompts() {
        let prompts = Prompts::Japanese;
        let system = prompts.system(4500, 5000);
        assert!(system.contains("本文は必ず4500字以上、5000字程度"));
        assert!(system.contains("1行目: タイトル:"));

        let now = Local.with_ymd_and_hms(2025, 5, 6, 9, 0, 0).unwrap();
        let user = prompts.topic("AI教育ツールの最新動向", now, &["古い記事".to_string()]);
        assert!(user.contains("トピック: AI教育ツールの最新動向"));
        assert!(user.contains("2025年5月時点"));
        assert!(user.contains("既に公開済み"));
        assert!(user.contains("- 古い記事"));

        let more = prompts.continuation("<p>本文</p>", 800);
        assert!(more.starts_with("既存の記事:\n<p>本文</p>\n\n"));
        assert!(more.contains("さらに約800字以上"));
    }

    #[test]
    fn test_other_language_prompts() {
        let prompts = Prompts::for_language("English");
        assert!(prompts.system(1800, 2000).contains("Write the article in English"));

        let user = prompts.digest("- [Feed] News: blurb", &[]);
        assert!(user.contains("[Latest news]\n- [Feed] News: blurb"));
        assert!(!user.contains("already published"));

        let now = Local.with_ymd_and_hms(2025, 5, 6, 9, 0, 0).unwrap();
        assert!(prompts.topic("agents", now, &[]).contains("as of May 2025"));
    }
}
