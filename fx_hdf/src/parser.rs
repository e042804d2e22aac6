//! HDF parser: builds a flat type table out of `struct`, `enum` and
//! `command` declarations.

use fx_lexer::{Lexer, TokenKind};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Primitive,
    Enum,
    Struct,
    Command,
    None,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    Int32,
    Uint32,
    Int16,
    Uint16,
    Int8,
    Uint8,
    Int64,
    Uint64,
    Float,
    Double,
    Bool,
}

impl PrimitiveKind {
    pub const ALL: [Self; 11] = [
        Self::Int32,
        Self::Uint32,
        Self::Int16,
        Self::Uint16,
        Self::Int8,
        Self::Uint8,
        Self::Int64,
        Self::Uint64,
        Self::Float,
        Self::Double,
        Self::Bool,
    ];

    /// The HDF-source spelling.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "bool",
        }
    }

    /// The emitted host-language spelling.
    pub const fn rust_name(&self) -> &'static str {
        match self {
            Self::Int32 => "i32",
            Self::Uint32 => "u32",
            Self::Int16 => "i16",
            Self::Uint16 => "u16",
            Self::Int8 => "i8",
            Self::Uint8 => "u8",
            Self::Int64 => "i64",
            Self::Uint64 => "u64",
            Self::Float => "f32",
            Self::Double => "f64",
            Self::Bool => "bool",
        }
    }

    pub const fn is_numeric(&self) -> bool {
        !matches!(self, Self::Bool)
    }
}

/// One entry in the type table. `member_types` holds indices back into the
/// same table.
#[derive(Clone, Debug)]
pub struct TypeEntry {
    pub kind: TypeKind,
    pub primitive: Option<PrimitiveKind>,
    pub name: String,
    pub member_names: Vec<String>,
    pub member_types: Vec<usize>,
    pub exportable: bool,
}

impl TypeEntry {
    fn named(kind: TypeKind, name: &str, exportable: bool) -> Self {
        Self {
            kind,
            primitive: None,
            name: name.to_owned(),
            member_names: Vec::new(),
            member_types: Vec::new(),
            exportable,
        }
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    types: Vec<TypeEntry>,
    max_types: usize,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>, max_types: usize) -> Self {
        let mut types = Vec::with_capacity(max_types.min(256));

        for primitive in PrimitiveKind::ALL {
            types.push(TypeEntry {
                kind: TypeKind::Primitive,
                primitive: Some(primitive),
                name: primitive.name().to_owned(),
                member_names: Vec::new(),
                member_types: Vec::new(),
                exportable: true,
            });
        }

        Self {
            lexer,
            types,
            max_types,
        }
    }

    pub fn types(&self) -> &[TypeEntry] {
        &self.types
    }

    pub fn has_error(&self) -> bool {
        self.lexer.has_error()
    }

    pub fn error_line(&self) -> u32 {
        self.lexer.error_line()
    }

    pub fn find_type(&self, name: &str) -> Option<usize> {
        self.types.iter().position(|entry| entry.name == name)
    }

    /// Consumes the whole token stream, appending one table entry per
    /// top-level declaration.
    pub fn generate_ast(&mut self) {
        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::Identifier => self.identifier(token.text),
                TokenKind::EndOfStream => break,
                _ => {}
            }
        }
    }

    fn identifier(&mut self, keyword: &str) {
        match keyword {
            "struct" => self.declaration_struct(),
            "enum" => self.declaration_enum(),
            "command" => self.declaration_command(),
            _ => {}
        }
    }

    fn push_type(&mut self, entry: TypeEntry) -> Option<usize> {
        if self.types.len() >= self.max_types {
            tracing::warn!("type table full, dropping `{}`", entry.name);
            return None;
        }

        self.types.push(entry);
        Some(self.types.len() - 1)
    }

    fn declaration_struct(&mut self) {
        let Some(name) = self.lexer.expect_token(TokenKind::Identifier) else {
            return;
        };
        let name = name.text.to_owned();

        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        let Some(index) = self.push_type(TypeEntry::named(TypeKind::Struct, &name, true)) else {
            return;
        };

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier => self.declaration_variable(token.text, index),
                _ => {}
            }
        }
    }

    /// A member line is `type_name name ;`.
    fn declaration_variable(&mut self, type_name: &str, owner: usize) {
        let member_type = self.find_type(type_name);

        let Some(name) = self.lexer.expect_token(TokenKind::Identifier) else {
            return;
        };
        let name = name.text.to_owned();

        if self.lexer.expect_token(TokenKind::Semicolon).is_none() {
            return;
        }

        let Some(member_type) = member_type else {
            tracing::warn!("unknown member type `{type_name}` for `{name}`, member skipped");
            return;
        };

        let entry = &mut self.types[owner];
        entry.member_types.push(member_type);
        entry.member_names.push(name);
    }

    fn declaration_enum(&mut self) {
        let Some(name) = self.lexer.expect_token(TokenKind::Identifier) else {
            return;
        };
        let name = name.text.to_owned();

        // Optional `: type` before the body.
        let mut token = self.lexer.next_token();
        if token.kind == TokenKind::Colon {
            // Backing type is noted in the source but not used.
            self.lexer.next_token();
            token = self.lexer.next_token();
        }

        if token.kind != TokenKind::OpenBrace {
            return;
        }

        let Some(index) = self.push_type(TypeEntry::named(TypeKind::Enum, &name, true)) else {
            return;
        };

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier => {
                    self.types[index].member_names.push(token.text.to_owned());
                }
                _ => {}
            }
        }
    }

    /// A command declares one inner struct per named case; the case structs
    /// join the table as non-exportable entries.
    fn declaration_command(&mut self) {
        let Some(name) = self.lexer.expect_token(TokenKind::Identifier) else {
            return;
        };
        let name = name.text.to_owned();

        if self.lexer.expect_token(TokenKind::OpenBrace).is_none() {
            return;
        }

        let Some(command) = self.push_type(TypeEntry::named(TypeKind::Command, &name, true)) else {
            return;
        };

        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                TokenKind::Identifier => {
                    let case_name = token.text.to_owned();
                    let Some(case) =
                        self.push_type(TypeEntry::named(TypeKind::Struct, &case_name, false))
                    else {
                        return;
                    };

                    loop {
                        let token = self.lexer.next_token();
                        match token.kind {
                            TokenKind::CloseBrace | TokenKind::EndOfStream => break,
                            TokenKind::Identifier => self.declaration_variable(token.text, case),
                            _ => {}
                        }
                    }

                    self.types[command].member_names.push(case_name);
                    self.types[command].member_types.push(case);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Parser, PrimitiveKind, TypeKind};
    use fx_lexer::Lexer;

    fn parse(source: &str) -> Parser<'_> {
        let mut parser = Parser::new(Lexer::new(source), 64);
        parser.generate_ast();
        parser
    }

    #[test]
    fn primitives_are_preregistered() {
        let parser = parse("");
        assert_eq!(parser.types().len(), 11);
        assert_eq!(parser.find_type("uint64"), Some(7));
        assert_eq!(
            parser.types()[8].primitive,
            Some(PrimitiveKind::Float)
        );
    }

    #[test]
    fn parses_struct_members_in_order() {
        let parser = parse("struct Vec2 { float x; float y; }");

        let index = parser.find_type("Vec2").unwrap();
        let entry = &parser.types()[index];
        assert_eq!(entry.kind, TypeKind::Struct);
        assert_eq!(entry.member_names, ["x", "y"]);
        assert!(entry.exportable);

        let float = parser.find_type("float").unwrap();
        assert_eq!(entry.member_types, [float, float]);
    }

    #[test]
    fn parses_enum_with_backing_type() {
        let parser = parse("enum Weapon : int32 { Sword Bow Axe }");

        let index = parser.find_type("Weapon").unwrap();
        let entry = &parser.types()[index];
        assert_eq!(entry.kind, TypeKind::Enum);
        assert_eq!(entry.member_names, ["Sword", "Bow", "Axe"]);
    }

    #[test]
    fn command_cases_become_hidden_structs() {
        let parser = parse(
            "command RenderCommands {\n\
             DrawQuad { float x; float y; }\n\
             Clear { float r; }\n\
             }",
        );

        let command = parser.find_type("RenderCommands").unwrap();
        let entry = &parser.types()[command];
        assert_eq!(entry.kind, TypeKind::Command);
        assert_eq!(entry.member_names, ["DrawQuad", "Clear"]);

        let quad = entry.member_types[0];
        let quad_entry = &parser.types()[quad];
        assert_eq!(quad_entry.kind, TypeKind::Struct);
        assert!(!quad_entry.exportable);
        assert_eq!(quad_entry.member_names, ["x", "y"]);
    }

    #[test]
    fn sticky_error_abandons_declaration() {
        // `struct` without a name latches the lexer error.
        let parser = parse("struct { float x; }");
        assert!(parser.has_error());
        assert!(parser.find_type("x").is_none());
    }
}
