//! Recursive-descent parser from the token stream to the AST.
//!
//! Only `Object`, `Protocol`, `Record`, `Enum`, `namespace`, `import` and
//! `@import` are accepted at the top level. Newlines are tolerated between
//! any two tokens and double as statement separators; commas in enum and
//! record bodies are optional the same way they are in the original
//! grammar.

use std::rc::Rc;

use crate::{
    exception::{ErrorKind, Exception, RunResult},
    expressions::{
        BinaryOp, Block, CmpOp, ConstructorDecl, Decl, ElseArm, EnumDecl, Expr, ExprLoc, IfStmt,
        ImportDecl, ImportPath, ImportSelector, Literal, Loc, LogicalOp, MethodDecl,
        NamespaceDecl, ObjectDecl, Param, Program, PropertyDecl, ProtocolDecl, ProtocolSignature,
        RecordDecl, Stmt, UnaryOp,
    },
    lexer::{Lexer, Token, TokenKind},
};

/// Lexes and parses a whole module.
pub fn parse_program(source: &str) -> RunResult<Program> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn loc(&self) -> Loc {
        Loc::new(self.current().line, self.current().column)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> RunResult<Token> {
        if self.kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> Exception {
        Exception::new(
            ErrorKind::Syntax,
            format!("{message} at line {}", self.current().line),
        )
    }

    fn skip_newlines(&mut self) {
        while self.matches(TokenKind::Newline) {}
    }

    // --- top level -------------------------------------------------------

    pub fn parse(mut self) -> RunResult<Program> {
        let mut decls = Vec::new();
        loop {
            self.skip_newlines();
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::Object => decls.push(Decl::Object(self.object_declaration()?)),
                TokenKind::Protocol => decls.push(Decl::Protocol(self.protocol_declaration()?)),
                TokenKind::Record => decls.push(Decl::Record(self.record_declaration()?)),
                TokenKind::Enum => decls.push(Decl::Enum(self.enum_declaration()?)),
                TokenKind::Import => decls.push(Decl::Import(self.import_declaration(false)?)),
                TokenKind::AtImport => decls.push(Decl::Import(self.import_declaration(true)?)),
                TokenKind::Namespace => {
                    if cfg!(feature = "namespaces") {
                        decls.push(Decl::Namespace(self.namespace_declaration()?));
                    } else {
                        return Err(self.error(
                            "Namespace support is disabled in this build; enable the \
                             'namespaces' feature to use the namespace form",
                        ));
                    }
                }
                _ => {
                    return Err(Exception::new(
                        ErrorKind::Syntax,
                        format!(
                            "Only object declarations, enum declarations, record declarations, \
                             protocol declarations, namespace declarations, and import \
                             statements are allowed at the top level. Found '{}' at line {}",
                            self.current().lexeme,
                            self.current().line
                        ),
                    ));
                }
            }
        }
        Ok(Program { decls })
    }

    fn object_declaration(&mut self) -> RunResult<ObjectDecl> {
        let object_token = self.expect(TokenKind::Object, "Expected 'Object'")?;
        let loc = Loc::new(object_token.line, object_token.column);
        let name = self
            .expect(TokenKind::Identifier, "Expected object name")?
            .lexeme;

        let protocol = if self.matches(TokenKind::Colon) {
            Some(
                self.expect(TokenKind::Identifier, "Expected protocol name after ':'")?
                    .lexeme,
            )
        } else {
            None
        };

        self.expect(TokenKind::LBrace, "Expected '{' after object name")?;

        let mut properties = Vec::new();
        let mut methods = Vec::new();
        let mut constructor = None;
        loop {
            self.skip_newlines();
            match self.kind() {
                TokenKind::RBrace | TokenKind::Eof => break,
                TokenKind::Property => properties.push(self.property_declaration()?),
                TokenKind::Method => methods.push(self.method_declaration(false)?),
                TokenKind::AtExternal => {
                    self.advance();
                    if self.kind() == TokenKind::Method {
                        methods.push(self.method_declaration(true)?);
                    } else {
                        return Err(
                            self.error("@external modifier can only be applied to methods")
                        );
                    }
                }
                TokenKind::Constructor => {
                    if constructor.is_some() {
                        return Err(self.error("Only one constructor allowed per object"));
                    }
                    constructor = Some(self.constructor_declaration()?);
                }
                _ => {
                    return Err(self.error(
                        "Expected property, method or constructor declaration in object",
                    ));
                }
            }
        }
        self.expect(TokenKind::RBrace, "Expected '}' to close object declaration")?;

        Ok(ObjectDecl {
            name,
            protocol,
            properties,
            constructor,
            methods,
            loc,
        })
    }

    fn property_declaration(&mut self) -> RunResult<PropertyDecl> {
        let property_token = self.expect(TokenKind::Property, "Expected 'property'")?;
        let name = self
            .expect(TokenKind::Identifier, "Expected property name")?
            .lexeme;
        self.expect(TokenKind::Colon, "Expected ':' after property name")?;
        let type_name = self.type_name()?;
        Ok(PropertyDecl {
            name,
            type_name,
            loc: Loc::new(property_token.line, property_token.column),
        })
    }

    fn parameter_list(&mut self) -> RunResult<Vec<Param>> {
        let mut params = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.kind(), TokenKind::RParen | TokenKind::Eof) {
                break;
            }
            // `$` marks a system parameter; the sigil stays part of the name.
            let system_param = self.matches(TokenKind::Dollar);
            let name_token = self.expect(TokenKind::Identifier, "Expected parameter name")?;
            self.expect(TokenKind::Colon, "Expected ':' after parameter name")?;
            let type_name = self.type_name()?;
            let name = if system_param {
                format!("${}", name_token.lexeme)
            } else {
                name_token.lexeme
            };
            params.push(Param { name, type_name });
            if self.matches(TokenKind::Comma) {
                self.skip_newlines();
            } else if self.kind() == TokenKind::Newline {
                self.skip_newlines();
            } else if self.kind() != TokenKind::RParen {
                return Err(self.error("Expected ',' or ')' in parameter list"));
            }
        }
        Ok(params)
    }

    fn method_declaration(&mut self, external: bool) -> RunResult<MethodDecl> {
        let method_token = self.expect(TokenKind::Method, "Expected 'method'")?;
        let name = self
            .expect(TokenKind::Identifier, "Expected method name")?
            .lexeme;
        self.expect(TokenKind::LParen, "Expected '(' after method name")?;
        let params = self.parameter_list()?;
        self.expect(TokenKind::RParen, "Expected ')' after parameters")?;
        self.expect(TokenKind::Colon, "Expected ':' after parameters")?;
        let return_type = self.type_name()?;
        self.expect(TokenKind::LBrace, "Expected '{' to start method body")?;
        let body = self.block_until_rbrace()?;
        self.expect(TokenKind::RBrace, "Expected '}' to end method body")?;
        Ok(MethodDecl {
            name,
            params,
            return_type,
            body: Rc::new(body),
            external,
            loc: Loc::new(method_token.line, method_token.column),
        })
    }

    fn constructor_declaration(&mut self) -> RunResult<ConstructorDecl> {
        let constructor_token = self.expect(TokenKind::Constructor, "Expected 'constructor'")?;
        self.expect(TokenKind::LParen, "Expected '(' after constructor")?;
        let params = self.parameter_list()?;
        self.expect(TokenKind::RParen, "Expected ')' after parameters")?;
        // A return type annotation is tolerated and discarded; constructors
        // do not return values.
        if self.matches(TokenKind::Colon) {
            self.type_name()?;
        }
        self.expect(TokenKind::LBrace, "Expected '{' to start constructor body")?;
        let body = self.block_until_rbrace()?;
        self.expect(TokenKind::RBrace, "Expected '}' to end constructor body")?;
        Ok(ConstructorDecl {
            params,
            body: Rc::new(body),
            loc: Loc::new(constructor_token.line, constructor_token.column),
        })
    }

    fn protocol_declaration(&mut self) -> RunResult<ProtocolDecl> {
        let protocol_token = self.expect(TokenKind::Protocol, "Expected 'Protocol'")?;
        let name = self
            .expect(TokenKind::Identifier, "Expected protocol name")?
            .lexeme;
        self.expect(TokenKind::LBrace, "Expected '{' after protocol name")?;

        let mut signatures = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.kind(), TokenKind::RBrace | TokenKind::Eof) {
                break;
            }
            self.expect(TokenKind::Method, "Expected 'method' in protocol")?;
            let method_name = self
                .expect(TokenKind::Identifier, "Expected method name")?
                .lexeme;
            self.expect(TokenKind::LParen, "Expected '(' after method name")?;
            let params = self.parameter_list()?;
            self.expect(TokenKind::RParen, "Expected ')' after parameters")?;
            self.expect(TokenKind::Colon, "Expected ':' after parameter list")?;
            let return_type = self.type_name()?;
            signatures.push(ProtocolSignature {
                name: method_name,
                params,
                return_type,
            });
        }
        self.expect(
            TokenKind::RBrace,
            "Expected '}' to close protocol declaration",
        )?;
        Ok(ProtocolDecl {
            name,
            signatures,
            loc: Loc::new(protocol_token.line, protocol_token.column),
        })
    }

    fn record_declaration(&mut self) -> RunResult<RecordDecl> {
        let record_token = self.expect(TokenKind::Record, "Expected 'Record'")?;
        let name = self
            .expect(TokenKind::Identifier, "Expected record name")?
            .lexeme;
        self.expect(TokenKind::LBrace, "Expected '{' after record name")?;

        let mut fields = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.kind(), TokenKind::RBrace | TokenKind::Eof) {
                break;
            }
            let field_name = self
                .expect(TokenKind::Identifier, "Expected field name")?
                .lexeme;
            self.expect(TokenKind::Colon, "Expected ':' after field name")?;
            let field_type = self.type_name()?;
            fields.push((field_name, field_type));
            // Comma separators are optional; a newline does the same job.
            self.matches(TokenKind::Comma);
        }
        self.expect(
            TokenKind::RBrace,
            "Expected '}' to close record declaration",
        )?;
        Ok(RecordDecl {
            name,
            fields,
            loc: Loc::new(record_token.line, record_token.column),
        })
    }

    fn enum_declaration(&mut self) -> RunResult<EnumDecl> {
        let enum_token = self.expect(TokenKind::Enum, "Expected 'Enum'")?;
        let name = self
            .expect(TokenKind::Identifier, "Expected enum name")?
            .lexeme;
        self.expect(TokenKind::LBrace, "Expected '{' after enum name")?;

        let mut members = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.kind(), TokenKind::RBrace | TokenKind::Eof) {
                break;
            }
            let member_name = self
                .expect(TokenKind::Identifier, "Expected enum member name")?
                .lexeme;
            let explicit = if self.matches(TokenKind::Assign) {
                let value_token =
                    self.expect(TokenKind::Number, "Expected integer value after '='")?;
                let value = value_token
                    .lexeme
                    .parse::<i64>()
                    .map_err(|_| self.error("Expected integer value after '='"))?;
                Some(value)
            } else {
                None
            };
            members.push((member_name, explicit));
            self.matches(TokenKind::Comma);
        }
        self.expect(TokenKind::RBrace, "Expected '}' to close enum declaration")?;
        Ok(EnumDecl {
            name,
            members,
            loc: Loc::new(enum_token.line, enum_token.column),
        })
    }

    fn namespace_declaration(&mut self) -> RunResult<NamespaceDecl> {
        let namespace_token = self.expect(TokenKind::Namespace, "Expected 'namespace'")?;
        let mut path = vec![
            self.expect(TokenKind::Identifier, "Expected namespace name")?
                .lexeme,
        ];
        while self.matches(TokenKind::Dot) {
            path.push(
                self.expect(TokenKind::Identifier, "Expected namespace part after '.'")?
                    .lexeme,
            );
        }
        self.expect(TokenKind::LBrace, "Expected '{' after namespace declaration")?;

        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            match self.kind() {
                TokenKind::RBrace | TokenKind::Eof => break,
                TokenKind::Object => body.push(Decl::Object(self.object_declaration()?)),
                TokenKind::Enum => body.push(Decl::Enum(self.enum_declaration()?)),
                TokenKind::Record => body.push(Decl::Record(self.record_declaration()?)),
                TokenKind::Protocol => body.push(Decl::Protocol(self.protocol_declaration()?)),
                _ => {
                    return Err(Exception::new(
                        ErrorKind::Syntax,
                        format!(
                            "Only object, enum, record, and protocol declarations are allowed \
                             inside namespaces. Found '{}' at line {}",
                            self.current().lexeme,
                            self.current().line
                        ),
                    ));
                }
            }
        }
        self.expect(
            TokenKind::RBrace,
            "Expected '}' to close namespace declaration",
        )?;
        Ok(NamespaceDecl {
            path,
            body,
            loc: Loc::new(namespace_token.line, namespace_token.column),
        })
    }

    fn import_declaration(&mut self, user_import: bool) -> RunResult<ImportDecl> {
        let import_token = if user_import {
            self.expect(TokenKind::AtImport, "Expected '@import'")?
        } else {
            self.expect(TokenKind::Import, "Expected 'import'")?
        };

        let mut parts = Vec::new();
        let mut wildcard = false;
        loop {
            parts.push(
                self.expect(TokenKind::Identifier, "Expected identifier in import path")?
                    .lexeme,
            );
            if self.matches(TokenKind::Dot) {
                if self.matches(TokenKind::Star) {
                    wildcard = true;
                    break;
                }
            } else {
                break;
            }
        }

        let object_name = parts.pop().expect("at least one import path part");
        let path = ImportPath {
            package_path: parts,
            object_name,
            selector: if wildcard {
                ImportSelector::Wildcard
            } else {
                ImportSelector::Object
            },
            user_import,
        };
        Ok(ImportDecl {
            path,
            loc: Loc::new(import_token.line, import_token.column),
        })
    }

    // --- statements ------------------------------------------------------

    fn block_until_rbrace(&mut self) -> RunResult<Block> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.kind(), TokenKind::RBrace | TokenKind::Eof) {
                break;
            }
            statements.push(self.statement()?);
        }
        Ok(Block { statements })
    }

    fn braced_block(&mut self, open_msg: &str, close_msg: &str) -> RunResult<Block> {
        self.expect(TokenKind::LBrace, open_msg)?;
        let block = self.block_until_rbrace()?;
        self.expect(TokenKind::RBrace, close_msg)?;
        Ok(block)
    }

    fn statement(&mut self) -> RunResult<Stmt> {
        self.skip_newlines();
        match self.kind() {
            TokenKind::Return => self.return_statement(),
            TokenKind::Const => self.const_declaration(),
            TokenKind::If => Ok(Stmt::If(self.if_statement()?)),
            TokenKind::While => self.while_statement(),
            TokenKind::Break => {
                let token = self.advance();
                Ok(Stmt::Break {
                    loc: Loc::new(token.line, token.column),
                })
            }
            TokenKind::Throw => self.throw_statement(),
            TokenKind::Try => self.try_statement(),
            TokenKind::Identifier if self.peek(1).kind == TokenKind::Colon => {
                self.variable_declaration()
            }
            TokenKind::Identifier if self.peek(1).kind == TokenKind::Assign => {
                self.variable_assignment()
            }
            TokenKind::This
                if self.peek(1).kind == TokenKind::Dot
                    && self.peek(2).kind == TokenKind::Identifier
                    && self.peek(3).kind == TokenKind::Assign =>
            {
                self.property_assignment()
            }
            _ => Ok(Stmt::Expr(self.expression()?)),
        }
    }

    fn return_statement(&mut self) -> RunResult<Stmt> {
        let return_token = self.expect(TokenKind::Return, "Expected 'return'")?;
        let loc = Loc::new(return_token.line, return_token.column);
        let value = if matches!(
            self.kind(),
            TokenKind::RBrace | TokenKind::Newline | TokenKind::Eof
        ) {
            None
        } else {
            Some(self.expression()?)
        };
        Ok(Stmt::Return { value, loc })
    }

    fn variable_declaration(&mut self) -> RunResult<Stmt> {
        let name_token = self.expect(TokenKind::Identifier, "Expected variable name")?;
        let loc = Loc::new(name_token.line, name_token.column);
        self.expect(TokenKind::Colon, "Expected ':' after variable name")?;
        let type_name = self.type_name()?;
        self.expect(TokenKind::Assign, "Expected '=' after type")?;
        // Set literals use parentheses and exist only in this declaration
        // context, keyed off the declared type.
        let init = if type_name.starts_with("Set<") && self.kind() == TokenKind::LParen {
            self.set_literal()?
        } else {
            self.expression()?
        };
        Ok(Stmt::VarDecl {
            name: name_token.lexeme,
            type_name,
            init,
            loc,
        })
    }

    fn variable_assignment(&mut self) -> RunResult<Stmt> {
        let name_token = self.expect(TokenKind::Identifier, "Expected variable name")?;
        let loc = Loc::new(name_token.line, name_token.column);
        self.expect(TokenKind::Assign, "Expected '=' after variable name")?;
        let value = self.expression()?;
        Ok(Stmt::Assign {
            name: name_token.lexeme,
            value,
            loc,
        })
    }

    fn const_declaration(&mut self) -> RunResult<Stmt> {
        let const_token = self.expect(TokenKind::Const, "Expected 'const'")?;
        let loc = Loc::new(const_token.line, const_token.column);
        let name = self
            .expect(TokenKind::Identifier, "Expected constant name")?
            .lexeme;
        self.expect(TokenKind::Colon, "Expected ':' after constant name")?;
        let type_name = self.type_name()?;
        self.expect(TokenKind::Assign, "Expected '=' after type")?;
        let init = self.expression()?;
        Ok(Stmt::ConstDecl {
            name,
            type_name,
            init,
            loc,
        })
    }

    fn property_assignment(&mut self) -> RunResult<Stmt> {
        let this_token = self.expect(TokenKind::This, "Expected 'this'")?;
        let loc = Loc::new(this_token.line, this_token.column);
        self.expect(TokenKind::Dot, "Expected '.' after 'this'")?;
        let name = self
            .expect(TokenKind::Identifier, "Expected property name after 'this.'")?
            .lexeme;
        self.expect(TokenKind::Assign, "Expected '=' after property name")?;
        let value = self.expression()?;
        Ok(Stmt::PropertyAssign { name, value, loc })
    }

    fn if_statement(&mut self) -> RunResult<IfStmt> {
        let if_token = self.expect(TokenKind::If, "Expected 'if'")?;
        let loc = Loc::new(if_token.line, if_token.column);
        self.expect(TokenKind::LParen, "Expected '(' after 'if'")?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after if condition")?;
        let then_block = self.braced_block(
            "Expected '{' after if condition",
            "Expected '}' to close if body",
        )?;
        let else_arm = if self.matches(TokenKind::Else) {
            if self.kind() == TokenKind::If {
                Some(Box::new(ElseArm::ElseIf(self.if_statement()?)))
            } else {
                Some(Box::new(ElseArm::Else(self.braced_block(
                    "Expected '{' after 'else'",
                    "Expected '}' to close else body",
                )?)))
            }
        } else {
            None
        };
        Ok(IfStmt {
            cond,
            then_block,
            else_arm,
            loc,
        })
    }

    fn while_statement(&mut self) -> RunResult<Stmt> {
        let while_token = self.expect(TokenKind::While, "Expected 'while'")?;
        let loc = Loc::new(while_token.line, while_token.column);
        self.expect(TokenKind::LParen, "Expected '(' after 'while'")?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after while condition")?;
        let body = self.braced_block(
            "Expected '{' after while condition",
            "Expected '}' to close while body",
        )?;
        Ok(Stmt::While { cond, body, loc })
    }

    fn throw_statement(&mut self) -> RunResult<Stmt> {
        let throw_token = self.expect(TokenKind::Throw, "Expected 'throw'")?;
        let loc = Loc::new(throw_token.line, throw_token.column);
        self.expect(TokenKind::LParen, "Expected '(' after 'throw'")?;
        let value = self.expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after throw expression")?;
        Ok(Stmt::Throw { value, loc })
    }

    fn try_statement(&mut self) -> RunResult<Stmt> {
        let try_token = self.expect(TokenKind::Try, "Expected 'try'")?;
        let loc = Loc::new(try_token.line, try_token.column);
        let body = self.braced_block(
            "Expected '{' after 'try'",
            "Expected '}' to close try block",
        )?;

        let catch = if self.matches(TokenKind::Catch) {
            self.expect(TokenKind::LParen, "Expected '(' after 'catch'")?;
            let variable = self
                .expect(TokenKind::Identifier, "Expected catch variable name")?
                .lexeme;
            self.expect(TokenKind::RParen, "Expected ')' after catch variable")?;
            let handler = self.braced_block(
                "Expected '{' after catch clause",
                "Expected '}' to close catch block",
            )?;
            Some((variable, handler))
        } else {
            None
        };

        let finally = if self.matches(TokenKind::Finally) {
            Some(self.braced_block(
                "Expected '{' after 'finally'",
                "Expected '}' to close finally block",
            )?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.error("Expected 'catch' or 'finally' after 'try' block"));
        }
        Ok(Stmt::Try {
            body,
            catch,
            finally,
            loc,
        })
    }

    // --- expressions -----------------------------------------------------
    //
    // Precedence, lowest to highest: `||`, `&&`, comparison, additive,
    // multiplicative, unary, primary.

    fn expression(&mut self) -> RunResult<ExprLoc> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> RunResult<ExprLoc> {
        let mut left = self.logical_and()?;
        while self.kind() == TokenKind::OrOr {
            let loc = self.loc();
            self.advance();
            let right = self.logical_and()?;
            left = ExprLoc::new(
                Expr::Logical {
                    left: Box::new(left),
                    op: LogicalOp::Or,
                    right: Box::new(right),
                },
                loc,
            );
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> RunResult<ExprLoc> {
        let mut left = self.comparison()?;
        while self.kind() == TokenKind::AndAnd {
            let loc = self.loc();
            self.advance();
            let right = self.comparison()?;
            left = ExprLoc::new(
                Expr::Logical {
                    left: Box::new(left),
                    op: LogicalOp::And,
                    right: Box::new(right),
                },
                loc,
            );
        }
        Ok(left)
    }

    fn comparison(&mut self) -> RunResult<ExprLoc> {
        let mut left = self.additive()?;
        loop {
            let op = match self.kind() {
                TokenKind::Eq => CmpOp::Eq,
                TokenKind::NotEq => CmpOp::NotEq,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::LtEq => CmpOp::LtEq,
                TokenKind::GtEq => CmpOp::GtEq,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.additive()?;
            left = ExprLoc::new(
                Expr::Comparison {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                loc,
            );
        }
        Ok(left)
    }

    fn additive(&mut self) -> RunResult<ExprLoc> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.multiplicative()?;
            left = ExprLoc::new(
                Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                loc,
            );
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> RunResult<ExprLoc> {
        let mut left = self.unary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.unary()?;
            left = ExprLoc::new(
                Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                loc,
            );
        }
        Ok(left)
    }

    fn unary(&mut self) -> RunResult<ExprLoc> {
        let op = match self.kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let loc = self.loc();
            self.advance();
            let operand = self.unary()?;
            return Ok(ExprLoc::new(
                Expr::Unary {
                    op,
                    operand: Box::new(operand),
                },
                loc,
            ));
        }
        self.primary()
    }

    /// Chain depth of member/method links, counting the expression itself.
    fn chain_depth(expr: &Expr) -> usize {
        match expr {
            Expr::MethodCall { object, .. } | Expr::MemberAccess { object, .. } => {
                1 + Self::chain_depth(&object.expr)
            }
            _ => 1,
        }
    }

    fn reconstruct_name(expr: &Expr) -> String {
        match expr {
            Expr::Identifier(name) => name.clone(),
            Expr::MemberAccess { object, member } => {
                format!("{}.{member}", Self::reconstruct_name(&object.expr))
            }
            Expr::MethodCall { object, method, .. } => {
                format!("{}.{method}", Self::reconstruct_name(&object.expr))
            }
            _ => "unknown".to_owned(),
        }
    }

    fn primary(&mut self) -> RunResult<ExprLoc> {
        let mut expr = self.atomic()?;
        while self.matches(TokenKind::Dot) {
            let member_token = self.expect(TokenKind::Identifier, "Expected member name after '.'")?;
            let loc = Loc::new(member_token.line, member_token.column);
            if self.kind() == TokenKind::LParen {
                // A deep dotted chain ending in a call reads like a static
                // method access, which the language does not have. The
                // depth counts the pending call plus the links already
                // parsed, so `obj.prop.method()` stays at 2 and is legal.
                if Self::chain_depth(&expr.expr) >= 3 {
                    let full_name =
                        format!("{}.{}", Self::reconstruct_name(&expr.expr), member_token.lexeme);
                    if let Some(last_dot) = full_name.rfind('.') {
                        let namespace_part = &full_name[..last_dot];
                        let method_part = &full_name[last_dot + 1..];
                        return Err(Exception::new(
                            ErrorKind::Syntax,
                            format!(
                                "Static method calls are not allowed. Use 'import \
                                 {namespace_part}' then create an instance with 'new \
                                 {method_part}()'"
                            ),
                        ));
                    }
                }
                self.advance(); // consume '('
                let args = self.call_arguments("argument list")?;
                expr = ExprLoc::new(
                    Expr::MethodCall {
                        object: Box::new(expr),
                        method: member_token.lexeme,
                        args,
                    },
                    loc,
                );
            } else {
                expr = ExprLoc::new(
                    Expr::MemberAccess {
                        object: Box::new(expr),
                        member: member_token.lexeme,
                    },
                    loc,
                );
            }
        }
        Ok(expr)
    }

    /// Parses a comma- or newline-separated expression list up to `)`,
    /// which is consumed.
    fn call_arguments(&mut self, what: &str) -> RunResult<Vec<ExprLoc>> {
        let mut args = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.kind(), TokenKind::RParen | TokenKind::Eof) {
                break;
            }
            args.push(self.expression()?);
            if self.matches(TokenKind::Comma) {
                self.skip_newlines();
            } else if self.kind() == TokenKind::Newline {
                self.skip_newlines();
            } else if self.kind() != TokenKind::RParen {
                return Err(self.error(&format!("Expected ',' or ')' in {what}")));
            }
        }
        self.expect(TokenKind::RParen, "Expected ')' to close argument list")?;
        Ok(args)
    }

    fn atomic(&mut self) -> RunResult<ExprLoc> {
        let token = self.current().clone();
        let loc = Loc::new(token.line, token.column);
        match token.kind {
            TokenKind::Str => {
                self.advance();
                Ok(ExprLoc::new(Expr::Literal(Literal::Text(token.lexeme)), loc))
            }
            TokenKind::Number => {
                self.advance();
                Ok(ExprLoc::new(
                    Expr::Literal(Self::number_literal(&token)?),
                    loc,
                ))
            }
            TokenKind::True => {
                self.advance();
                Ok(ExprLoc::new(Expr::Literal(Literal::Bool(true)), loc))
            }
            TokenKind::False => {
                self.advance();
                Ok(ExprLoc::new(Expr::Literal(Literal::Bool(false)), loc))
            }
            TokenKind::CharLit => {
                self.advance();
                let c = token.lexeme.chars().next().expect("non-empty char literal");
                Ok(ExprLoc::new(Expr::Literal(Literal::Char(c)), loc))
            }
            TokenKind::Identifier => self.identifier_expression(),
            TokenKind::Dollar => {
                self.advance();
                let identifier =
                    self.expect(TokenKind::Identifier, "Expected identifier after '$'")?;
                Ok(ExprLoc::new(
                    Expr::Identifier(format!("${}", identifier.lexeme)),
                    loc,
                ))
            }
            TokenKind::New => self.new_expression(),
            TokenKind::This => {
                self.advance();
                Ok(ExprLoc::new(Expr::This, loc))
            }
            TokenKind::LBracket => self.list_literal(),
            TokenKind::LBrace => self.map_literal(),
            TokenKind::ResultKw => self.result_static_call(),
            TokenKind::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(
                    TokenKind::RParen,
                    "Expected ')' to close parenthesized expression",
                )?;
                Ok(expr)
            }
            _ => Err(Exception::new(
                ErrorKind::Syntax,
                format!(
                    "Unexpected token '{}' at line {}",
                    token.lexeme, token.line
                ),
            )),
        }
    }

    fn number_literal(token: &Token) -> RunResult<Literal> {
        let text = &token.lexeme;
        let invalid = || {
            Exception::new(
                ErrorKind::Syntax,
                format!("Invalid number literal '{text}' at line {}", token.line),
            )
        };
        match text.chars().last() {
            Some('f' | 'F') => text[..text.len() - 1]
                .parse::<f32>()
                .map(Literal::Float)
                .map_err(|_| invalid()),
            Some('d' | 'D') => text[..text.len() - 1]
                .parse::<f64>()
                .map(Literal::Double)
                .map_err(|_| invalid()),
            Some('l' | 'L') => text[..text.len() - 1]
                .parse::<i128>()
                .map(Literal::Long)
                .map_err(|_| invalid()),
            _ if text.contains('.') => text.parse::<f64>().map(Literal::Double).map_err(|_| invalid()),
            _ => text.parse::<i64>().map(Literal::Int).map_err(|_| invalid()),
        }
    }

    fn identifier_expression(&mut self) -> RunResult<ExprLoc> {
        let identifier_token = self.expect(TokenKind::Identifier, "Expected identifier")?;
        let loc = Loc::new(identifier_token.line, identifier_token.column);

        if self.kind() != TokenKind::LParen {
            return Ok(ExprLoc::new(Expr::Identifier(identifier_token.lexeme), loc));
        }
        self.advance(); // consume '('

        // Lookahead: `ident '='` at the first argument marks a record
        // instantiation rather than a function call.
        let saved = self.pos;
        self.skip_newlines();
        let record_instantiation =
            self.kind() == TokenKind::Identifier && self.peek(1).kind == TokenKind::Assign;
        self.pos = saved;

        if record_instantiation {
            let mut fields = Vec::new();
            loop {
                self.skip_newlines();
                if matches!(self.kind(), TokenKind::RParen | TokenKind::Eof) {
                    break;
                }
                let field_name = self
                    .expect(TokenKind::Identifier, "Expected field name")?
                    .lexeme;
                self.expect(TokenKind::Assign, "Expected '=' after field name")?;
                let value = self.expression()?;
                fields.push((field_name, value));
                if self.matches(TokenKind::Comma) {
                    self.skip_newlines();
                } else if self.kind() == TokenKind::Newline {
                    self.skip_newlines();
                } else if self.kind() != TokenKind::RParen {
                    return Err(self.error("Expected ',' or ')' in record field list"));
                }
            }
            self.expect(TokenKind::RParen, "Expected ')' after record fields")?;
            Ok(ExprLoc::new(
                Expr::RecordInit {
                    type_name: identifier_token.lexeme,
                    fields,
                },
                loc,
            ))
        } else {
            let args = self.call_arguments("argument list")?;
            Ok(ExprLoc::new(
                Expr::FunctionCall {
                    name: identifier_token.lexeme,
                    args,
                },
                loc,
            ))
        }
    }

    fn new_expression(&mut self) -> RunResult<ExprLoc> {
        let new_token = self.expect(TokenKind::New, "Expected 'new'")?;
        let loc = Loc::new(new_token.line, new_token.column);

        let mut type_name = match self.kind() {
            TokenKind::Identifier | TokenKind::ErrorKw | TokenKind::ResultKw => {
                self.advance().lexeme
            }
            _ => return Err(self.error("Expected object type name after 'new'")),
        };
        // Qualified type names reach objects registered inside namespaces.
        while self.matches(TokenKind::Dot) {
            let part = self.expect(
                TokenKind::Identifier,
                "Expected identifier after '.' in type name",
            )?;
            type_name.push('.');
            type_name.push_str(&part.lexeme);
        }

        self.expect(TokenKind::LParen, "Expected '(' after object type name")?;
        let args = self.call_arguments("constructor arguments")?;
        Ok(ExprLoc::new(Expr::New { type_name, args }, loc))
    }

    fn result_static_call(&mut self) -> RunResult<ExprLoc> {
        let result_token = self.expect(TokenKind::ResultKw, "Expected 'Result'")?;
        let loc = Loc::new(result_token.line, result_token.column);
        self.expect(TokenKind::Dot, "Expected '.' after 'Result'")?;
        let method_token = self.expect(
            TokenKind::Identifier,
            "Expected 'success' or 'error' after 'Result.'",
        )?;
        if method_token.lexeme != "success" && method_token.lexeme != "error" {
            return Err(Exception::new(
                ErrorKind::Syntax,
                format!(
                    "Expected 'success' or 'error' after 'Result.' at line {}",
                    method_token.line
                ),
            ));
        }
        self.expect(TokenKind::LParen, "Expected '(' after Result static method")?;
        let mut args = Vec::new();
        if self.kind() != TokenKind::RParen {
            args.push(self.expression()?);
        }
        self.expect(TokenKind::RParen, "Expected ')' after Result static argument")?;
        Ok(ExprLoc::new(
            Expr::FunctionCall {
                name: format!("Result.{}", method_token.lexeme),
                args,
            },
            loc,
        ))
    }

    fn list_literal(&mut self) -> RunResult<ExprLoc> {
        let bracket_token = self.expect(TokenKind::LBracket, "Expected '['")?;
        let loc = Loc::new(bracket_token.line, bracket_token.column);
        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.kind(), TokenKind::RBracket | TokenKind::Eof) {
                break;
            }
            elements.push(self.expression()?);
            if self.matches(TokenKind::Comma) {
                self.skip_newlines();
            } else if self.kind() == TokenKind::Newline {
                self.skip_newlines();
            } else if self.kind() != TokenKind::RBracket {
                return Err(self.error("Expected ',' or ']' in list literal"));
            }
        }
        self.expect(TokenKind::RBracket, "Expected ']' to close list literal")?;
        Ok(ExprLoc::new(Expr::ListLit(elements), loc))
    }

    fn map_literal(&mut self) -> RunResult<ExprLoc> {
        let brace_token = self.expect(TokenKind::LBrace, "Expected '{'")?;
        let loc = Loc::new(brace_token.line, brace_token.column);
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.kind(), TokenKind::RBrace | TokenKind::Eof) {
                break;
            }
            let key = self.expression()?;
            self.skip_newlines();
            self.expect(TokenKind::Colon, "Expected ':' after map key")?;
            self.skip_newlines();
            let value = self.expression()?;
            entries.push((key, value));
            self.skip_newlines();
            if self.matches(TokenKind::Comma) {
                self.skip_newlines();
            } else if self.kind() != TokenKind::RBrace {
                return Err(self.error("Expected ',' or '}' in map literal"));
            }
        }
        self.expect(TokenKind::RBrace, "Expected '}' to close map literal")?;
        Ok(ExprLoc::new(Expr::MapLit(entries), loc))
    }

    fn set_literal(&mut self) -> RunResult<ExprLoc> {
        let paren_token = self.expect(TokenKind::LParen, "Expected '(' to start set literal")?;
        let loc = Loc::new(paren_token.line, paren_token.column);
        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.kind(), TokenKind::RParen | TokenKind::Eof) {
                break;
            }
            elements.push(self.expression()?);
            self.skip_newlines();
            if self.matches(TokenKind::Comma) {
                self.skip_newlines();
            } else if self.kind() != TokenKind::RParen {
                return Err(self.error("Expected ',' or ')' in set literal"));
            }
        }
        self.expect(TokenKind::RParen, "Expected ')' to close set literal")?;
        Ok(ExprLoc::new(Expr::SetLit(elements), loc))
    }

    /// Parses a type name, including the one-level generics the language
    /// supports: `List<T>`, `Set<T>`, `Map<K, V>`, `Result<T, E>`.
    fn type_name(&mut self) -> RunResult<String> {
        let mut base = match self.kind() {
            TokenKind::Identifier | TokenKind::ResultKw | TokenKind::ErrorKw => {
                self.advance().lexeme
            }
            _ => return Err(self.error("Expected type name")),
        };
        if self.kind() == TokenKind::Lt {
            self.advance();
            let first = self.generic_parameter()?;
            if (base == "Map" || base == "Result") && self.matches(TokenKind::Comma) {
                self.skip_newlines();
                let second = self.generic_parameter()?;
                self.expect(TokenKind::Gt, "Expected '>' after generic type parameters")?;
                base = format!("{base}<{first}, {second}>");
            } else {
                self.expect(TokenKind::Gt, "Expected '>' after generic type parameter")?;
                base = format!("{base}<{first}>");
            }
        }
        Ok(base)
    }

    fn generic_parameter(&mut self) -> RunResult<String> {
        match self.kind() {
            TokenKind::Identifier | TokenKind::ResultKw | TokenKind::ErrorKw => {
                Ok(self.advance().lexeme)
            }
            _ => Err(self.error("Expected generic type parameter")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        parse_program(source).unwrap()
    }

    fn parse_err(source: &str) -> Exception {
        parse_program(source).unwrap_err()
    }

    #[test]
    fn simple_object_declaration() {
        let program = parse("Object TestObject {}");
        assert_eq!(program.decls.len(), 1);
        let Decl::Object(decl) = &program.decls[0] else {
            panic!("expected object declaration");
        };
        assert_eq!(decl.name, "TestObject");
    }

    #[test]
    fn object_with_external_method_and_protocol() {
        let program = parse(
            "Object Greeter: Speaks {\n    @external method greet(name: Text): Text {\n        \
             return name\n    }\n}",
        );
        let Decl::Object(decl) = &program.decls[0] else {
            panic!("expected object declaration");
        };
        assert_eq!(decl.protocol.as_deref(), Some("Speaks"));
        assert!(decl.methods[0].external);
        assert_eq!(decl.methods[0].params[0].type_name, "Text");
    }

    #[test]
    fn top_level_rejects_statements() {
        let err = parse_err("x: Int = 1");
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(err.message().contains("allowed at the top level"));
    }

    #[test]
    fn record_instantiation_lookahead() {
        let program = parse(
            "Object Main {\n    method main(): Int {\n        p: Pair = Pair(a=1, b=2)\n        \
             q: Int = f(1, 2)\n        return 0\n    }\n}",
        );
        let Decl::Object(decl) = &program.decls[0] else {
            panic!("expected object");
        };
        let body = &decl.methods[0].body;
        assert!(matches!(
            &body.statements[0],
            Stmt::VarDecl { init, .. } if matches!(&init.expr, Expr::RecordInit { .. })
        ));
        assert!(matches!(
            &body.statements[1],
            Stmt::VarDecl { init, .. } if matches!(&init.expr, Expr::FunctionCall { .. })
        ));
    }

    #[test]
    fn deep_static_chain_is_rejected_with_guidance() {
        let err = parse_err(
            "Object Main {\n    method main(): Int {\n        a.b.c.d()\n        return 0\n    \
             }\n}",
        );
        assert!(err.message().contains("Static method calls are not allowed"));
        assert!(err.message().contains("import a.b.c"));
        assert!(err.message().contains("new d()"));
    }

    #[test]
    fn two_part_chain_calls_are_allowed() {
        // `obj.prop.method()` must stay legal.
        parse(
            "Object Main {\n    method main(): Int {\n        obj.prop.size()\n        return \
             0\n    }\n}",
        );
    }

    #[test]
    fn try_requires_catch_or_finally() {
        let err = parse_err(
            "Object Main {\n    method main(): Int {\n        try { return 1 }\n        return \
             0\n    }\n}",
        );
        assert!(err.message().contains("Expected 'catch' or 'finally'"));
    }

    #[test]
    fn number_literal_suffixes_select_variants() {
        let program = parse(
            "Object Main {\n    method main(): Int {\n        a: Float = 1.5f\n        b: Double \
             = 2.5\n        c: Long = 7L\n        d: Double = 3d\n        return 0\n    }\n}",
        );
        let Decl::Object(decl) = &program.decls[0] else {
            panic!("expected object");
        };
        let stmts = &decl.methods[0].body.statements;
        let literal = |stmt: &Stmt| match stmt {
            Stmt::VarDecl { init, .. } => match &init.expr {
                Expr::Literal(lit) => lit.clone(),
                other => panic!("expected literal, got {other:?}"),
            },
            other => panic!("expected var decl, got {other:?}"),
        };
        assert_eq!(literal(&stmts[0]), Literal::Float(1.5));
        assert_eq!(literal(&stmts[1]), Literal::Double(2.5));
        assert_eq!(literal(&stmts[2]), Literal::Long(7));
        assert_eq!(literal(&stmts[3]), Literal::Double(3.0));
    }

    #[test]
    fn set_literal_only_in_declaration_context() {
        let program = parse(
            "Object Main {\n    method main(): Int {\n        s: Set<Int> = (1, 2, 2)\n        \
             return s.size()\n    }\n}",
        );
        let Decl::Object(decl) = &program.decls[0] else {
            panic!("expected object");
        };
        assert!(matches!(
            &decl.methods[0].body.statements[0],
            Stmt::VarDecl { init, .. } if matches!(&init.expr, Expr::SetLit(items) if items.len() == 3)
        ));
    }

    #[test]
    fn import_forms() {
        let program = parse("import system.io\n@import src.util.Helpers\nimport math.Calc.*");
        let paths: Vec<&ImportPath> = program
            .decls
            .iter()
            .map(|decl| match decl {
                Decl::Import(import) => &import.path,
                other => panic!("expected import, got {other:?}"),
            })
            .collect();
        assert_eq!(paths[0].package_path, vec!["system".to_owned()]);
        assert_eq!(paths[0].object_name, "io");
        assert!(!paths[0].user_import);
        assert!(paths[1].user_import);
        assert_eq!(paths[1].object_name, "Helpers");
        assert_eq!(paths[2].selector, ImportSelector::Wildcard);
    }

    #[test]
    fn canonical_rendering_reparses_to_the_same_tree() {
        let source = "Record Pair {\n    a: Int\n    b: Int\n}\nEnum Status {\n    OK\n    WARN \
                      = 10\n    FAIL\n}\nProtocol Speaks {\n    method greet(name: Text): \
                      Text\n}\nObject Main {\n    property count: Int\n    constructor() {\n        \
                      this.count = 0\n    }\n    @external method main(): Int {\n        x: Int = \
                      3 + 4 * 2\n        p: Pair = Pair(a=1, b=2)\n        if (x > 5) {\n            \
                      return x\n        } else {\n            return 0\n        }\n    }\n}";
        let first = parse(source);
        let rendered = first.to_string();
        let second = parse_program(&rendered).unwrap();
        assert_eq!(rendered, second.to_string());
    }
}
