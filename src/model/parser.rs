// File: src/model/parser.rs
//! Todo.txt line grammar.
//!
//! A line goes through four stages: whitespace tokenizing, one-token-lookback
//! classification, positional validation and finally record building.
//!
//! ```text
//! [x ][(A|B|C) ][yyyy-mm-dd ]<title words> @<list words> [+<parent words>] [due:yyyy-mm-dd]
//! @<list words>
//! ```
use crate::error::ParseError;
use crate::model::Priority;
use chrono::NaiveDate;
use strum::Display;

const DUE_PREFIX: &str = "due:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenKind {
    /// Sentinel for "no previous token".
    Start,
    Complete,
    Priority,
    CreationDate,
    Title,
    ListName,
    ParentName,
    DueDate,
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedToken<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Fields recovered from one task line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskRecord {
    pub title: String,
    pub completed: bool,
    pub priority: Priority,
    pub created: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub list: String,
    pub parent_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// `@Name` on its own line.
    ListDeclaration(String),
    Task(TaskRecord),
}

impl ParsedLine {
    pub fn list_name(&self) -> &str {
        match self {
            ParsedLine::ListDeclaration(name) => name,
            ParsedLine::Task(record) => &record.list,
        }
    }
}

// --- TOKENIZER ---

/// Splits a line on runs of whitespace. Never yields empty tokens.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

// --- DATES ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateLayout {
    YearMonthDay,
    DayMonthYear,
}

fn date_layout(token: &str) -> Option<DateLayout> {
    let sep = ['-', '/', '.'].into_iter().find(|c| token.contains(*c))?;
    let parts: Vec<&str> = token.split(sep).collect();
    if parts.len() != 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    let lens = (parts[0].len(), parts[1].len(), parts[2].len());
    match (sep, lens) {
        ('-', (4, 1..=2, 1..=2)) => Some(DateLayout::YearMonthDay),
        ('/' | '.', (1..=2, 1..=2, 4)) => Some(DateLayout::DayMonthYear),
        _ => None,
    }
}

/// True when the token has the shape of a date, valid or not.
pub fn looks_like_date(token: &str) -> bool {
    date_layout(token).is_some()
}

/// Parses `YYYY-MM-DD`, `DD/MM/YYYY` or `DD.MM.YYYY` into a calendar date.
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    let layout = date_layout(token)?;
    let nums: Vec<u32> = token
        .split(['-', '/', '.'])
        .map(|p| p.parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;
    let (year, month, day) = match layout {
        DateLayout::YearMonthDay => (nums[0], nums[1], nums[2]),
        DateLayout::DayMonthYear => (nums[2], nums[1], nums[0]),
    };
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

// --- CLASSIFIER ---

fn is_word(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphanumeric)
}

fn is_priority(token: &str) -> bool {
    let chars: Vec<char> = token.chars().collect();
    chars.len() == 3 && chars[0] == '(' && chars[2] == ')'
}

/// Classifies `token` given the kind assigned to the token before it.
pub fn classify(token: &str, previous: TokenKind) -> TokenKind {
    let long = token.chars().count() > 1;

    if token == "x" {
        return TokenKind::Complete;
    }
    if is_priority(token) {
        return TokenKind::Priority;
    }
    if !token.starts_with(DUE_PREFIX) && looks_like_date(token) {
        return TokenKind::CreationDate;
    }
    if is_word(token)
        && matches!(
            previous,
            TokenKind::Start
                | TokenKind::CreationDate
                | TokenKind::Priority
                | TokenKind::Complete
                | TokenKind::Title
        )
    {
        return TokenKind::Title;
    }
    if long && token.starts_with('@') {
        return TokenKind::ListName;
    }
    if long && token.starts_with('+') {
        return TokenKind::ParentName;
    }
    if is_word(token) && previous == TokenKind::ListName {
        return TokenKind::ListName;
    }
    if is_word(token) && previous == TokenKind::ParentName {
        return TokenKind::ParentName;
    }
    if token.starts_with(DUE_PREFIX) {
        return TokenKind::DueDate;
    }
    TokenKind::Unrecognized
}

/// Classifies a whole token sequence left to right.
pub fn classify_tokens<'a>(tokens: &[&'a str]) -> Vec<ClassifiedToken<'a>> {
    let mut previous = TokenKind::Start;
    tokens
        .iter()
        .map(|&text| {
            let kind = classify(text, previous);
            previous = kind;
            ClassifiedToken { kind, text }
        })
        .collect()
}

// --- VALIDATOR ---

fn misplaced(token: &ClassifiedToken<'_>, position: usize) -> ParseError {
    ParseError::MisplacedToken {
        kind: token.kind,
        token: token.text.to_string(),
        position,
    }
}

/// Accepts or rejects a classified line. Positions are 1-based.
pub fn validate(tokens: &[ClassifiedToken<'_>]) -> Result<(), ParseError> {
    if is_list_declaration(tokens) {
        return Ok(());
    }

    let mut complete = false;
    let mut priority = false;
    let mut created = false;
    let mut due = false;
    let mut title_words = 0usize;
    let mut list_groups = 0usize;
    let mut parent_groups = 0usize;
    let mut previous = TokenKind::Start;

    for (idx, token) in tokens.iter().enumerate() {
        let position = idx + 1;
        match token.kind {
            TokenKind::Complete => {
                if position != 1 {
                    return Err(misplaced(token, position));
                }
                complete = true;
            }
            TokenKind::Priority => {
                if priority || position != usize::from(complete) + 1 {
                    return Err(misplaced(token, position));
                }
                priority = true;
            }
            TokenKind::CreationDate => {
                if created || position != usize::from(complete) + usize::from(priority) + 1 {
                    return Err(misplaced(token, position));
                }
                if parse_date(token.text).is_none() {
                    return Err(ParseError::InvalidDate {
                        token: token.text.to_string(),
                    });
                }
                created = true;
            }
            TokenKind::Title => title_words += 1,
            TokenKind::ListName => {
                if previous != TokenKind::ListName {
                    list_groups += 1;
                    if list_groups > 1 {
                        return Err(misplaced(token, position));
                    }
                }
            }
            TokenKind::ParentName => {
                if previous != TokenKind::ParentName {
                    parent_groups += 1;
                    if parent_groups > 1 {
                        return Err(misplaced(token, position));
                    }
                }
            }
            TokenKind::DueDate => {
                if due {
                    return Err(misplaced(token, position));
                }
                if parse_date(&token.text[DUE_PREFIX.len()..]).is_none() {
                    return Err(ParseError::InvalidDate {
                        token: token.text.to_string(),
                    });
                }
                due = true;
            }
            TokenKind::Start | TokenKind::Unrecognized => {
                return Err(ParseError::UnrecognizedToken {
                    token: token.text.to_string(),
                });
            }
        }
        previous = token.kind;
    }

    if list_groups == 0 {
        return Err(ParseError::MissingListName);
    }
    if title_words == 0 {
        return Err(ParseError::MissingTitle);
    }
    Ok(())
}

fn is_list_declaration(tokens: &[ClassifiedToken<'_>]) -> bool {
    !tokens.is_empty() && tokens.iter().all(|t| t.kind == TokenKind::ListName)
}

// --- PARSER ---

fn append_word(target: &mut Option<String>, word: &str) {
    match target {
        Some(s) => {
            s.push(' ');
            s.push_str(word);
        }
        None => *target = Some(word.to_string()),
    }
}

/// Builds the record for an already validated token sequence.
pub fn build_record(tokens: &[ClassifiedToken<'_>]) -> ParsedLine {
    let mut record = TaskRecord::default();
    let mut title: Option<String> = None;
    let mut list: Option<String> = None;
    let mut parent: Option<String> = None;
    let mut previous = TokenKind::Start;

    for token in tokens {
        match token.kind {
            TokenKind::Complete => record.completed = true,
            TokenKind::Priority => {
                record.priority = token
                    .text
                    .chars()
                    .nth(1)
                    .map(Priority::from_letter)
                    .unwrap_or_default();
            }
            TokenKind::CreationDate => record.created = parse_date(token.text),
            TokenKind::Title => append_word(&mut title, token.text),
            TokenKind::ListName => {
                let word = if previous == TokenKind::ListName {
                    token.text
                } else {
                    &token.text[1..]
                };
                append_word(&mut list, word);
            }
            TokenKind::ParentName => {
                let word = if previous == TokenKind::ParentName {
                    token.text
                } else {
                    &token.text[1..]
                };
                append_word(&mut parent, word);
            }
            TokenKind::DueDate => record.due = parse_date(&token.text[DUE_PREFIX.len()..]),
            TokenKind::Start | TokenKind::Unrecognized => {}
        }
        previous = token.kind;
    }

    let list = list.unwrap_or_default().trim().to_string();
    if is_list_declaration(tokens) {
        return ParsedLine::ListDeclaration(list);
    }

    record.title = title.unwrap_or_default().trim().to_string();
    record.list = list;
    record.parent_title = parent.map(|p| p.trim().to_string());
    ParsedLine::Task(record)
}

/// Full pipeline for one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ParsedLine>, ParseError> {
    let tokens = tokenize(line);
    if tokens.is_empty() {
        return Ok(None);
    }
    let classified = classify_tokens(&tokens);
    validate(&classified)?;
    Ok(Some(build_record(&classified)))
}

// --- REPRESENTABILITY ---

/// Collapses whitespace runs the way a re-read would: `" Buy  milk "` ->
/// `"Buy milk"`.
pub fn normalize_words(text: &str) -> String {
    tokenize(text).join(" ")
}

/// A title survives a write/read cycle only if every word is alphanumeric
/// and no word reads as the completion marker.
pub fn is_valid_title(title: &str) -> bool {
    let words = tokenize(title);
    !words.is_empty() && words.iter().all(|w| is_word(w) && *w != "x")
}

/// The first word may hold any non-space characters; the rest must be
/// alphanumeric so they keep accumulating into the name.
pub fn is_valid_list_name(name: &str) -> bool {
    let words = tokenize(name);
    match words.split_first() {
        Some((first, rest)) => {
            let token = format!("@{}", first);
            classify(&token, TokenKind::Start) == TokenKind::ListName
                && rest.iter().all(|w| is_word(w) && *w != "x")
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<TokenKind> {
        classify_tokens(&tokenize(line))
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tokenize_collapses_whitespace() {
        assert_eq!(tokenize("  Buy   milk\t@Errands  "), vec!["Buy", "milk", "@Errands"]);
        assert_eq!(
            tokenize("Buy    milk     @Errands"),
            tokenize("Buy milk @Errands")
        );
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_classify_precedence() {
        assert_eq!(classify("(A)", TokenKind::Title), TokenKind::Priority);
        assert_eq!(classify("(Z)", TokenKind::Start), TokenKind::Priority);
        assert_eq!(classify("x", TokenKind::Title), TokenKind::Complete);
        assert_eq!(classify("2020-01-01", TokenKind::Title), TokenKind::CreationDate);
        assert_eq!(classify("due:2020-01-01", TokenKind::Title), TokenKind::DueDate);
        assert_eq!(classify("milk", TokenKind::ListName), TokenKind::ListName);
        assert_eq!(classify("milk", TokenKind::ParentName), TokenKind::ParentName);
        assert_eq!(classify("milk", TokenKind::DueDate), TokenKind::Unrecognized);
        assert_eq!(classify("@", TokenKind::Title), TokenKind::Unrecognized);
        assert_eq!(classify("+", TokenKind::Title), TokenKind::Unrecognized);
        assert_eq!(classify("milk!", TokenKind::Title), TokenKind::Unrecognized);
    }

    #[test]
    fn test_classify_full_line() {
        use TokenKind::*;
        assert_eq!(
            kinds("x (A) 2020-01-01 Buy milk @Errands due:2020-01-05"),
            vec![Complete, Priority, CreationDate, Title, Title, ListName, DueDate]
        );
        assert_eq!(
            kinds("Call mom @Personal +Family Stuff"),
            vec![Title, Title, ListName, ParentName, ParentName]
        );
    }

    #[test]
    fn test_date_shapes() {
        assert_eq!(parse_date("2020-01-05"), Some(date(2020, 1, 5)));
        assert_eq!(parse_date("05/01/2020"), Some(date(2020, 1, 5)));
        assert_eq!(parse_date("5.1.2020"), Some(date(2020, 1, 5)));
        assert!(looks_like_date("2020-13-45"));
        assert_eq!(parse_date("2020-13-45"), None);
        assert!(!looks_like_date("2020"));
        assert!(!looks_like_date("12"));
        assert!(!looks_like_date("2020-01/05"));
    }

    #[test]
    fn test_scenario_full_featured_line() {
        let parsed = parse_line("x (A) 2020-01-01 Buy milk @Errands due:2020-01-05")
            .unwrap()
            .unwrap();
        let ParsedLine::Task(record) = parsed else {
            panic!("expected a task line");
        };
        assert!(record.completed);
        assert_eq!(record.priority.weight(), 3);
        assert_eq!(record.title, "Buy milk");
        assert_eq!(record.list, "Errands");
        assert_eq!(record.created, Some(date(2020, 1, 1)));
        assert_eq!(record.due, Some(date(2020, 1, 5)));
        assert_eq!(record.parent_title, None);
    }

    #[test]
    fn test_scenario_subtask_line() {
        let Some(ParsedLine::Task(record)) = parse_line("Call mom @Personal +Family").unwrap()
        else {
            panic!("expected a task line");
        };
        assert_eq!(record.title, "Call mom");
        assert_eq!(record.list, "Personal");
        assert_eq!(record.parent_title.as_deref(), Some("Family"));
    }

    #[test]
    fn test_scenario_list_declaration() {
        assert_eq!(
            parse_line("@Shopping").unwrap(),
            Some(ParsedLine::ListDeclaration("Shopping".to_string()))
        );
        assert_eq!(
            parse_line("@Weekend Errands").unwrap(),
            Some(ParsedLine::ListDeclaration("Weekend Errands".to_string()))
        );
    }

    #[test]
    fn test_multi_word_list_name() {
        let Some(ParsedLine::Task(record)) = parse_line("Paint fence @Home Projects").unwrap()
        else {
            panic!("expected a task line");
        };
        assert_eq!(record.list, "Home Projects");
    }

    #[test]
    fn test_rejects_misplaced_complete() {
        assert!(matches!(
            parse_line("x x Buy milk @Errands"),
            Err(ParseError::MisplacedToken { kind: TokenKind::Complete, position: 2, .. })
        ));
        assert!(matches!(
            parse_line("(A) x Buy milk @Errands"),
            Err(ParseError::MisplacedToken { kind: TokenKind::Complete, .. })
        ));
        assert!(matches!(
            parse_line("Buy x @Errands"),
            Err(ParseError::MisplacedToken { .. })
        ));
    }

    #[test]
    fn test_rejects_misplaced_priority_and_date() {
        assert!(matches!(
            parse_line("Buy (A) milk @Errands"),
            Err(ParseError::MisplacedToken { kind: TokenKind::Priority, .. })
        ));
        assert!(matches!(
            parse_line("2020-01-01 (A) Buy @Errands"),
            Err(ParseError::MisplacedToken { kind: TokenKind::Priority, .. })
        ));
        assert!(matches!(
            parse_line("Buy milk 2020-01-01 @Errands"),
            Err(ParseError::MisplacedToken { kind: TokenKind::CreationDate, .. })
        ));
    }

    #[test]
    fn test_rejects_missing_list() {
        assert_eq!(parse_line("Buy milk"), Err(ParseError::MissingListName));
        assert_eq!(parse_line("(B) Buy milk due:2020-01-01"), Err(ParseError::MissingListName));
    }

    #[test]
    fn test_rejects_invalid_dates() {
        assert!(matches!(
            parse_line("2020-02-30 Buy milk @Errands"),
            Err(ParseError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse_line("Buy milk @Errands due:tomorrow"),
            Err(ParseError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse_line("Buy milk @Errands due:"),
            Err(ParseError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_rejects_unrecognized_and_untitled() {
        assert!(matches!(
            parse_line("Buy milk! @Errands"),
            Err(ParseError::UnrecognizedToken { .. })
        ));
        assert!(matches!(
            parse_line("Buy milk @Errands due:2020-01-01 later"),
            Err(ParseError::UnrecognizedToken { .. })
        ));
        assert_eq!(parse_line("(A) @Errands"), Err(ParseError::MissingTitle));
        assert!(matches!(
            parse_line("Buy @Home due:2020-01-01 @Work"),
            Err(ParseError::MisplacedToken { kind: TokenKind::ListName, .. })
        ));
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   "), Ok(None));
    }

    #[test]
    fn test_representable_names() {
        assert!(is_valid_title("Buy milk"));
        assert!(!is_valid_title("Buy milk!"));
        assert!(!is_valid_title("Find x"));
        assert!(!is_valid_title("   "));
        assert!(is_valid_list_name("Errands"));
        assert!(is_valid_list_name("Home Projects"));
        assert!(is_valid_list_name("work-stuff"));
        assert!(!is_valid_list_name("Home (A)"));
        assert!(!is_valid_list_name(""));
        assert!(!is_valid_list_name("Home x"));
    }

    #[test]
    fn test_normalized_title_reads_back_unchanged() {
        let title = normalize_words("  Buy \t milk  ");
        assert_eq!(title, "Buy milk");
        let line = format!("{} @Home", title);
        let Some(ParsedLine::Task(record)) = parse_line(&line).unwrap() else {
            panic!("expected a task line");
        };
        assert_eq!(record.title, title);
    }
}
