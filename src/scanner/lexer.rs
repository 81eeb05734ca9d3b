use winnow::combinator::alt;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::stream::{LocatingSlice, Location, Stream};
use winnow::token::{any, take_while};

use crate::error::CompileError;
use crate::scanner::token::{Span, Token, TokenKind, keyword_kind};

type Input<'a> = LocatingSlice<&'a str>;

/// Skip blanks and `#` comments. Newlines are significant and left in place.
fn blanks_and_comments<'a>(input: &mut Input<'a>) -> ModalResult<()> {
    loop {
        let before = input.current_token_start();
        take_while(0.., |c: char| c == ' ' || c == '\t' || c == '\r')
            .void()
            .parse_next(input)?;

        if input.starts_with('#') {
            take_while(0.., |c: char| c != '\n')
                .void()
                .parse_next(input)?;
        } else if input.current_token_start() == before {
            break;
        }
    }
    Ok(())
}

fn string_literal<'a>(input: &mut Input<'a>) -> ModalResult<Token> {
    let start = input.current_token_start();
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let c = any
            .parse_next(input)
            .map_err(|_: winnow::error::ErrMode<ContextError>| {
                winnow::error::ErrMode::Cut(ContextError::new())
            })?;
        match c {
            '"' => break,
            '\\' => {
                let esc =
                    any.parse_next(input)
                        .map_err(|_: winnow::error::ErrMode<ContextError>| {
                            winnow::error::ErrMode::Cut(ContextError::new())
                        })?;
                match esc {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    '\\' => s.push('\\'),
                    '"' => s.push('"'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            other => s.push(other),
        }
    }
    let end = input.current_token_start();
    Ok(Token::new(TokenKind::String, s, Span::new(start, end - start)))
}

fn number_literal<'a>(input: &mut Input<'a>) -> ModalResult<Token> {
    let start = input.current_token_start();
    let whole: &str = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let mut lexeme = whole.to_string();
    let mut kind = TokenKind::Integer;

    let checkpoint = input.checkpoint();
    let dot_result: Result<char, winnow::error::ErrMode<ContextError>> = '.'.parse_next(input);
    if dot_result.is_ok() {
        match take_while::<_, _, ContextError>(1.., |c: char| c.is_ascii_digit()).parse_next(input)
        {
            Ok(frac) => {
                lexeme.push('.');
                lexeme.push_str(frac);
                kind = TokenKind::Float;
            }
            Err(_) => {
                input.reset(&checkpoint);
            }
        }
    }

    let end = input.current_token_start();
    Ok(Token::new(kind, lexeme, Span::new(start, end - start)))
}

fn identifier_or_keyword<'a>(input: &mut Input<'a>) -> ModalResult<Token> {
    let start = input.current_token_start();
    let first: char = any
        .verify(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .parse_next(input)?;
    let rest: &str =
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)?;
    let end = input.current_token_start();
    let mut lexeme = String::with_capacity(1 + rest.len());
    lexeme.push(first);
    lexeme.push_str(rest);
    let kind = keyword_kind(&lexeme).unwrap_or(TokenKind::Identifier);
    Ok(Token::new(kind, lexeme, Span::new(start, end - start)))
}

fn two_char_token<'a>(input: &mut Input<'a>) -> ModalResult<Token> {
    let start = input.current_token_start();
    let (kind, lexeme) = alt((
        "!=".value((TokenKind::BangEqual, "!=")),
        "==".value((TokenKind::EqualEqual, "==")),
        ">=".value((TokenKind::GreaterEqual, ">=")),
        "<=".value((TokenKind::LessEqual, "<=")),
        "+=".value((TokenKind::PlusEqual, "+=")),
        "-=".value((TokenKind::MinusEqual, "-=")),
        "*=".value((TokenKind::StarEqual, "*=")),
        "/=".value((TokenKind::SlashEqual, "/=")),
        "%=".value((TokenKind::PercentEqual, "%=")),
    ))
    .parse_next(input)?;
    Ok(Token::new(kind, lexeme, Span::new(start, 2)))
}

fn single_char_token<'a>(input: &mut Input<'a>) -> ModalResult<Token> {
    let start = input.current_token_start();
    let c = any
        .verify(|c: &char| "(){},;\n-+/*%!=<>".contains(*c))
        .parse_next(input)?;
    let kind = match c {
        '(' => TokenKind::LeftParen,
        ')' => TokenKind::RightParen,
        '{' => TokenKind::LeftBrace,
        '}' => TokenKind::RightBrace,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semicolon,
        '\n' => TokenKind::Newline,
        '-' => TokenKind::Minus,
        '+' => TokenKind::Plus,
        '/' => TokenKind::Slash,
        '*' => TokenKind::Star,
        '%' => TokenKind::Percent,
        '!' => TokenKind::Bang,
        '=' => TokenKind::Equal,
        '<' => TokenKind::Less,
        '>' => TokenKind::Greater,
        _ => unreachable!("verify guarantees valid char"),
    };
    Ok(Token::new(kind, c.to_string(), Span::new(start, 1)))
}

fn scan_token<'a>(input: &mut Input<'a>) -> ModalResult<Token> {
    alt((
        string_literal,
        number_literal,
        identifier_or_keyword,
        two_char_token,
        single_char_token,
    ))
    .parse_next(input)
}

/// Scan all tokens from source, returning either a token list or scan errors.
pub fn scan_all(source: &str) -> Result<Vec<Token>, Vec<CompileError>> {
    let mut input = LocatingSlice::new(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    loop {
        if blanks_and_comments(&mut input).is_err() {
            break;
        }
        if input.is_empty() {
            break;
        }
        let checkpoint = input.checkpoint();
        match scan_token(&mut input) {
            Ok(token) if token.kind == TokenKind::Integer && token.lexeme.parse::<i64>().is_err() => {
                errors.push(CompileError::scan(
                    format!("integer literal '{}' is out of range", token.lexeme),
                    token.span.offset,
                    token.span.len,
                ));
            }
            Ok(token) => tokens.push(token),
            Err(_) => {
                input.reset(&checkpoint);
                let offset = input.current_token_start();
                if input.starts_with('"') {
                    let _ = take_while::<_, _, ContextError>(0.., |_: char| true)
                        .parse_next(&mut input);
                    errors.push(CompileError::scan(
                        "unterminated string",
                        offset,
                        source.len() - offset,
                    ));
                } else {
                    let ch = any::<_, ContextError>.parse_next(&mut input).ok();
                    errors.push(CompileError::scan(
                        format!("unexpected character '{}'", ch.unwrap_or('?')),
                        offset,
                        1,
                    ));
                }
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof, "", Span::new(source.len(), 0)));

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}
