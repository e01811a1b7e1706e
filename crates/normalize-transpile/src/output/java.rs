//! Java writer for Target IR.
//!
//! Emits one compilation unit per [`TargetFile`]: package line, sorted
//! imports, then the top-level type. Parentheses are inserted only where
//! operator precedence needs them.

use crate::target::{
    FieldDecl, JavaExpr, JavaLiteral, JavaStmt, JavaType, MethodDecl, Modifiers, TargetFile,
    TypeDecl, TypeKind, TypeParam,
};
use crate::traits::{WriteOptions, Writer};
use std::fmt::Write;

/// Static instance of the Java writer for registry.
pub static JAVA_WRITER: JavaWriterImpl = JavaWriterImpl;

/// Java writer implementing the Writer trait.
pub struct JavaWriterImpl;

impl Writer for JavaWriterImpl {
    fn language(&self) -> &'static str {
        "java"
    }

    fn extension(&self) -> &'static str {
        "java"
    }

    fn write(&self, file: &TargetFile, options: &WriteOptions) -> String {
        JavaWriter::emit(file, options)
    }
}

/// Precedence levels, loosest first.
mod prec {
    pub const ASSIGN: u8 = 1;
    pub const CONDITIONAL: u8 = 2;
    pub const UNARY: u8 = 13;
    pub const POSTFIX: u8 = 14;
}

fn binary_prec(op: &str) -> u8 {
    match op {
        "||" => 3,
        "&&" => 4,
        "|" => 5,
        "^" => 6,
        "&" => 7,
        "==" | "!=" => 8,
        "<" | ">" | "<=" | ">=" => 9,
        "<<" | ">>" | ">>>" => 10,
        "+" | "-" => 11,
        "*" | "/" | "%" => 12,
        _ => 3,
    }
}

fn expr_prec(expr: &JavaExpr) -> u8 {
    match expr {
        JavaExpr::Assign { .. } => prec::ASSIGN,
        JavaExpr::Conditional { .. } => prec::CONDITIONAL,
        JavaExpr::Binary { op, .. } => binary_prec(op),
        JavaExpr::InstanceOf { .. } => 9,
        JavaExpr::Unary { .. } | JavaExpr::Cast { .. } => prec::UNARY,
        _ => prec::POSTFIX,
    }
}

/// Emits Target IR as Java source code.
pub struct JavaWriter {
    output: String,
    indent: usize,
    unit: String,
}

impl JavaWriter {
    pub fn new(options: &WriteOptions) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            unit: " ".repeat(options.indent),
        }
    }

    /// Emit a file to Java source.
    pub fn emit(file: &TargetFile, options: &WriteOptions) -> String {
        let mut writer = Self::new(options);
        writer.write_file(file);
        writer.output
    }

    fn write_file(&mut self, file: &TargetFile) {
        if !file.package.is_empty() {
            let _ = writeln!(self.output, "package {};", file.package);
            self.output.push('\n');
        }
        if !file.imports.is_empty() {
            for import in &file.imports {
                let _ = writeln!(self.output, "import {};", import);
            }
            self.output.push('\n');
        }
        self.write_type(&file.decl);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str(&self.unit);
        }
    }

    fn line(&mut self, text: &str) {
        self.write_indent();
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn comment_lines(&mut self, text: &str) {
        for line in text.lines() {
            let line = format!("// {}", line);
            self.line(line.trim_end());
        }
    }

    fn write_modifiers(&mut self, modifiers: &Modifiers, in_interface: bool) {
        if !in_interface {
            if let Some(keyword) = modifiers.visibility.keyword() {
                self.output.push_str(keyword);
                self.output.push(' ');
            }
        }
        if modifiers.is_abstract && !in_interface {
            self.output.push_str("abstract ");
        }
        if modifiers.is_static {
            self.output.push_str("static ");
        }
        if modifiers.is_final {
            self.output.push_str("final ");
        }
    }

    fn write_type_params(&mut self, params: &[TypeParam]) {
        if params.is_empty() {
            return;
        }
        let rendered: Vec<String> = params
            .iter()
            .map(|p| match &p.bound {
                Some(bound) => format!("{} extends {}", p.name, bound.spelling()),
                None => p.name.clone(),
            })
            .collect();
        let _ = write!(self.output, "<{}>", rendered.join(", "));
    }

    fn write_type(&mut self, decl: &TypeDecl) {
        for note in &decl.notes {
            self.comment_lines(note);
        }
        self.write_indent();
        let mut modifiers = decl.modifiers.clone();
        if decl.kind != TypeKind::Class {
            // Interfaces and enums are implicitly abstract / final
            modifiers.is_abstract = false;
            modifiers.is_final = false;
        }
        self.write_modifiers(&modifiers, false);
        let keyword = match decl.kind {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
        };
        let _ = write!(self.output, "{} {}", keyword, decl.name);
        self.write_type_params(&decl.type_params);

        let supertypes = |types: &[JavaType]| {
            types
                .iter()
                .map(JavaType::spelling)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match decl.kind {
            TypeKind::Interface => {
                if !decl.implements.is_empty() {
                    let _ = write!(self.output, " extends {}", supertypes(&decl.implements));
                }
            }
            TypeKind::Class | TypeKind::Enum => {
                if let Some(extends) = &decl.extends {
                    let _ = write!(self.output, " extends {}", extends.spelling());
                }
                if !decl.implements.is_empty() {
                    let _ = write!(self.output, " implements {}", supertypes(&decl.implements));
                }
            }
        }
        self.output.push_str(" {\n");
        self.indent += 1;

        let mut first = true;
        if !decl.constants.is_empty() {
            for (i, constant) in decl.constants.iter().enumerate() {
                self.write_indent();
                self.output.push_str(&constant.name);
                if !constant.args.is_empty() {
                    self.output.push('(');
                    self.write_args(&constant.args);
                    self.output.push(')');
                }
                let last = i + 1 == decl.constants.len();
                let has_body = !decl.fields.is_empty() || !decl.methods.is_empty();
                self.output.push_str(match (last, has_body) {
                    (false, _) => ",\n",
                    (true, true) => ";\n",
                    (true, false) => "\n",
                });
            }
            first = false;
        }

        if !decl.fields.is_empty() {
            if !first {
                self.output.push('\n');
            }
            for field in &decl.fields {
                self.write_field(field, decl.kind == TypeKind::Interface);
            }
            first = false;
        }

        let in_interface = decl.kind == TypeKind::Interface;
        for method in &decl.methods {
            if !first {
                self.output.push('\n');
            }
            self.write_method(method, &decl.name, in_interface);
            first = false;
        }

        for nested in &decl.nested {
            if !first {
                self.output.push('\n');
            }
            self.write_type(nested);
            first = false;
        }

        self.indent -= 1;
        self.line("}");
    }

    fn write_field(&mut self, field: &FieldDecl, in_interface: bool) {
        if let Some(comment) = &field.comment {
            self.comment_lines(comment);
        }
        self.write_indent();
        self.write_modifiers(&field.modifiers, in_interface);
        let _ = write!(self.output, "{} {}", field.ty.spelling(), field.name);
        if let Some(init) = &field.init {
            self.output.push_str(" = ");
            self.write_expr(init, prec::ASSIGN);
        }
        self.output.push_str(";\n");
    }

    fn write_method(&mut self, method: &MethodDecl, class_name: &str, in_interface: bool) {
        if let Some(comment) = &method.comment {
            self.comment_lines(comment);
        }
        if method.is_override {
            self.line("@Override");
        }
        self.write_indent();
        if in_interface {
            if method.modifiers.is_static {
                self.output.push_str("static ");
            } else if method.body.is_some() {
                self.output.push_str("default ");
            }
        } else {
            self.write_modifiers(&method.modifiers, false);
        }
        if !method.type_params.is_empty() {
            self.write_type_params(&method.type_params);
            self.output.push(' ');
        }
        match &method.return_type {
            Some(ty) => {
                let _ = write!(self.output, "{} {}", ty.spelling(), method.name);
            }
            // Constructors take the simple name of their class
            None => self
                .output
                .push_str(class_name.rsplit('.').next().unwrap_or(class_name)),
        }
        self.output.push('(');
        let params: Vec<String> = method
            .params
            .iter()
            .map(|p| format!("{} {}", p.ty.spelling(), p.name))
            .collect();
        self.output.push_str(&params.join(", "));
        self.output.push(')');
        match &method.body {
            None => self.output.push_str(";\n"),
            Some(body) => {
                self.output.push(' ');
                self.write_block(body);
                self.output.push('\n');
            }
        }
    }

    /// `{ ... }` with the closing brace at the current indent, no trailing newline.
    fn write_block(&mut self, body: &[JavaStmt]) {
        self.output.push_str("{\n");
        self.indent += 1;
        for stmt in body {
            self.write_stmt(stmt);
        }
        self.indent -= 1;
        self.write_indent();
        self.output.push('}');
    }

    fn write_stmt(&mut self, stmt: &JavaStmt) {
        match stmt {
            JavaStmt::Comment(text) => {
                self.comment_lines(text);
                return;
            }
            JavaStmt::Stub(message) => {
                self.comment_lines(&format!("MANUAL FIX: {}", message));
                self.write_indent();
                let _ = writeln!(
                    self.output,
                    "throw new UnsupportedOperationException(\"{}\");",
                    escape_string(message)
                );
                return;
            }
            _ => {}
        }
        self.write_indent();
        self.write_stmt_body(stmt);
        self.output.push('\n');
    }

    /// A statement after its indentation, without the trailing newline.
    fn write_stmt_body(&mut self, stmt: &JavaStmt) {
        match stmt {
            JavaStmt::Local { .. } | JavaStmt::Expr(_) => {
                self.write_stmt_inline(stmt);
                self.output.push(';');
            }
            JavaStmt::Return(value) => {
                self.output.push_str("return");
                if let Some(value) = value {
                    self.output.push(' ');
                    self.write_expr(value, prec::ASSIGN);
                }
                self.output.push(';');
            }
            JavaStmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.output.push_str("if (");
                self.write_expr(cond, prec::ASSIGN);
                self.output.push_str(") ");
                self.write_block(then);
                if let Some(otherwise) = otherwise {
                    self.output.push_str(" else ");
                    match otherwise.as_slice() {
                        [nested @ JavaStmt::If { .. }] => self.write_stmt_body(nested),
                        _ => self.write_block(otherwise),
                    }
                }
            }
            JavaStmt::While { cond, body } => {
                self.output.push_str("while (");
                self.write_expr(cond, prec::ASSIGN);
                self.output.push_str(") ");
                self.write_block(body);
            }
            JavaStmt::For {
                init,
                cond,
                step,
                body,
            } => {
                self.output.push_str("for (");
                if let Some(init) = init {
                    self.write_stmt_inline(init);
                }
                self.output.push(';');
                if let Some(cond) = cond {
                    self.output.push(' ');
                    self.write_expr(cond, prec::ASSIGN);
                }
                self.output.push(';');
                if let Some(step) = step {
                    self.output.push(' ');
                    self.write_expr(step, prec::ASSIGN);
                }
                self.output.push_str(") ");
                self.write_block(body);
            }
            JavaStmt::Block(body) => self.write_block(body),
            JavaStmt::Throw(value) => {
                self.output.push_str("throw ");
                self.write_expr(value, prec::ASSIGN);
                self.output.push(';');
            }
            JavaStmt::Break => self.output.push_str("break;"),
            JavaStmt::Continue => self.output.push_str("continue;"),
            JavaStmt::TryFinally { body, finally } => {
                self.output.push_str("try ");
                self.write_block(body);
                self.output.push_str(" finally ");
                self.write_block(finally);
            }
            JavaStmt::Comment(text) => {
                let _ = write!(self.output, "/* {} */", text.replace("*/", "* /"));
            }
            JavaStmt::Stub(message) => {
                let _ = write!(
                    self.output,
                    "throw new UnsupportedOperationException(\"{}\");",
                    escape_string(message)
                );
            }
        }
    }

    /// Local declarations and expressions without the semicolon (for-loop init).
    fn write_stmt_inline(&mut self, stmt: &JavaStmt) {
        match stmt {
            JavaStmt::Local { ty, name, init } => {
                let _ = write!(self.output, "{} {}", ty.spelling(), name);
                if let Some(init) = init {
                    self.output.push_str(" = ");
                    self.write_expr(init, prec::ASSIGN);
                }
            }
            JavaStmt::Expr(expr) => self.write_expr(expr, prec::ASSIGN),
            _ => {}
        }
    }

    fn write_args(&mut self, args: &[JavaExpr]) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.write_expr(arg, prec::ASSIGN);
        }
    }

    /// Write `expr`, parenthesized when it binds looser than `min`.
    fn write_expr(&mut self, expr: &JavaExpr, min: u8) {
        let parens = expr_prec(expr) < min;
        if parens {
            self.output.push('(');
        }
        self.write_expr_inner(expr);
        if parens {
            self.output.push(')');
        }
    }

    fn write_expr_inner(&mut self, expr: &JavaExpr) {
        match expr {
            JavaExpr::Literal(lit) => self.write_literal(lit),
            JavaExpr::Ident(name) => self.output.push_str(name),
            JavaExpr::This => self.output.push_str("this"),
            JavaExpr::Super => self.output.push_str("super"),
            JavaExpr::Field { object, name } => {
                self.write_expr(object, prec::POSTFIX);
                let _ = write!(self.output, ".{}", name);
            }
            JavaExpr::StaticField { class, name } => {
                let _ = write!(self.output, "{}.{}", raw_name(class), name);
            }
            JavaExpr::Call { target, name, args } => {
                if let Some(target) = target {
                    self.write_expr(target, prec::POSTFIX);
                    self.output.push('.');
                }
                self.output.push_str(name);
                self.output.push('(');
                self.write_args(args);
                self.output.push(')');
            }
            JavaExpr::StaticCall { class, name, args } => {
                let _ = write!(self.output, "{}.{}(", raw_name(class), name);
                self.write_args(args);
                self.output.push(')');
            }
            JavaExpr::New { ty, args } => {
                let _ = write!(self.output, "new {}(", ty.spelling());
                self.write_args(args);
                self.output.push(')');
            }
            JavaExpr::NewArray { element, len } => {
                let (base, dims) = array_base(element);
                let _ = write!(self.output, "new {}[", base.spelling());
                self.write_expr(len, prec::ASSIGN);
                self.output.push(']');
                for _ in 0..dims {
                    self.output.push_str("[]");
                }
            }
            JavaExpr::Binary { op, left, right } => {
                let p = binary_prec(op);
                self.write_expr(left, p);
                let _ = write!(self.output, " {} ", op);
                self.write_expr(right, p + 1);
            }
            JavaExpr::Unary { op, operand } => {
                self.output.push_str(op);
                // `- -x` must not print as `--x`
                let clash = matches!(operand.as_ref(), JavaExpr::Unary { op: inner, .. } if inner.starts_with(op.as_str()))
                    || matches!(operand.as_ref(), JavaExpr::Literal(JavaLiteral::Int(v) | JavaLiteral::Long(v)) if *v < 0 && op == "-");
                if clash {
                    self.output.push('(');
                    self.write_expr_inner(operand);
                    self.output.push(')');
                } else {
                    self.write_expr(operand, prec::UNARY);
                }
            }
            JavaExpr::Assign { target, value } => {
                self.write_expr(target, prec::UNARY);
                self.output.push_str(" = ");
                self.write_expr(value, prec::ASSIGN);
            }
            JavaExpr::Index { array, index } => {
                self.write_expr(array, prec::POSTFIX);
                self.output.push('[');
                self.write_expr(index, prec::ASSIGN);
                self.output.push(']');
            }
            JavaExpr::Cast { ty, value } => {
                let _ = write!(self.output, "({}) ", ty.spelling());
                self.write_expr(value, prec::UNARY);
            }
            JavaExpr::InstanceOf { value, ty } => {
                self.write_expr(value, 10);
                let _ = write!(self.output, " instanceof {}", raw_name(ty));
            }
            JavaExpr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.write_expr(cond, prec::CONDITIONAL + 1);
                self.output.push_str(" ? ");
                self.write_expr(then, prec::CONDITIONAL + 1);
                self.output.push_str(" : ");
                self.write_expr(otherwise, prec::CONDITIONAL);
            }
        }
    }

    fn write_literal(&mut self, lit: &JavaLiteral) {
        match lit {
            JavaLiteral::Null => self.output.push_str("null"),
            JavaLiteral::Bool(b) => {
                let _ = write!(self.output, "{}", b);
            }
            JavaLiteral::Int(n) => {
                let _ = write!(self.output, "{}", n);
            }
            JavaLiteral::Long(n) => {
                let _ = write!(self.output, "{}L", n);
            }
            JavaLiteral::Float(f) => self.output.push_str(&float_literal(*f)),
            JavaLiteral::Char(c) => {
                let escaped = match c {
                    '\'' => "\\'".to_string(),
                    '\\' => "\\\\".to_string(),
                    '\n' => "\\n".to_string(),
                    '\t' => "\\t".to_string(),
                    '\0' => "\\0".to_string(),
                    c => c.to_string(),
                };
                let _ = write!(self.output, "'{}'", escaped);
            }
            JavaLiteral::String(s) => {
                let _ = write!(self.output, "\"{}\"", escape_string(s));
            }
        }
    }
}

/// Class name without generic arguments, for static access and `instanceof`.
fn raw_name(ty: &JavaType) -> String {
    match ty {
        JavaType::Class { name, .. } => name.clone(),
        other => other.spelling(),
    }
}

/// Innermost element type and the number of extra dimensions.
fn array_base(ty: &JavaType) -> (&JavaType, usize) {
    match ty {
        JavaType::Array(inner) => {
            let (base, dims) = array_base(inner);
            (base, dims + 1)
        }
        other => (other, 0),
    }
}

fn float_literal(f: f64) -> String {
    if f.is_nan() {
        "Double.NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 {
            "Double.POSITIVE_INFINITY".to_string()
        } else {
            "Double.NEGATIVE_INFINITY".to_string()
        }
    } else {
        // Debug keeps a fractional part (`1.0`, not `1`)
        format!("{:?}", f)
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{EnumConstant, Param, Visibility};

    fn emit(file: &TargetFile) -> String {
        JavaWriter::emit(file, &WriteOptions::default())
    }

    #[test]
    fn precedence_drives_parentheses() {
        let sum = JavaExpr::binary(JavaExpr::ident("a"), "+", JavaExpr::ident("b"));
        let product = JavaExpr::binary(sum.clone(), "*", JavaExpr::ident("c"));
        let mut writer = JavaWriter::new(&WriteOptions::default());
        writer.write_expr(&product, prec::ASSIGN);
        assert_eq!(writer.output, "(a + b) * c");

        let mut writer = JavaWriter::new(&WriteOptions::default());
        let nested = JavaExpr::binary(JavaExpr::ident("a"), "-", sum);
        writer.write_expr(&nested, prec::ASSIGN);
        assert_eq!(writer.output, "a - (a + b)");
    }

    #[test]
    fn stub_renders_marker_and_throw() {
        let mut decl = TypeDecl::class("Shape");
        decl.methods.push(MethodDecl::stub(
            "area",
            JavaType::primitive("int"),
            vec![],
            "manual resolution required",
        ));
        let out = emit(&TargetFile::new("geo", decl));
        insta::assert_snapshot!(out, @r#"
        package geo;

        public class Shape {
            public int area() {
                // MANUAL FIX: manual resolution required
                throw new UnsupportedOperationException("manual resolution required");
            }
        }
        "#);
    }

    #[test]
    fn interface_and_enum_shapes() {
        let mut iface = TypeDecl::interface("IDrawable");
        let mut draw = MethodDecl::new("draw", JavaType::Void, vec![]);
        draw.body = None;
        iface.methods.push(draw);
        insta::assert_snapshot!(emit(&TargetFile::new("", iface)), @r"
        public interface IDrawable {
            void draw();
        }
        ");

        let mut color = TypeDecl::class("Color");
        color.kind = TypeKind::Enum;
        color.constants = vec![
            EnumConstant { name: "RED".into(), args: vec![] },
            EnumConstant { name: "GREEN".into(), args: vec![] },
        ];
        insta::assert_snapshot!(emit(&TargetFile::new("", color)), @r"
        public enum Color {
            RED,
            GREEN
        }
        ");
    }

    #[test]
    fn try_finally_and_constructor() {
        let mut decl = TypeDecl::class("Guard");
        decl.fields.push(FieldDecl::new(
            "count",
            JavaType::primitive("int"),
            Modifiers {
                visibility: Visibility::Private,
                ..Modifiers::default()
            },
        ));
        let ctor = MethodDecl::constructor("Guard", vec![Param::new("count", JavaType::primitive("int"))])
            .with_body(vec![JavaStmt::expr(JavaExpr::assign(
                JavaExpr::this_field("count"),
                JavaExpr::ident("count"),
            ))]);
        decl.methods.push(ctor);
        let run = MethodDecl::new("run", JavaType::Void, vec![]).with_body(vec![
            JavaStmt::Local {
                ty: JavaType::simple("Lock"),
                name: "lock".into(),
                init: Some(JavaExpr::New {
                    ty: JavaType::simple("Lock"),
                    args: vec![],
                }),
            },
            JavaStmt::TryFinally {
                body: vec![JavaStmt::Return(None)],
                finally: vec![JavaStmt::expr(JavaExpr::call(JavaExpr::ident("lock"), "close", vec![]))],
            },
        ]);
        decl.methods.push(run);
        insta::assert_snapshot!(emit(&TargetFile::new("", decl)), @r"
        public class Guard {
            private int count;

            public Guard(int count) {
                this.count = count;
            }

            public void run() {
                Lock lock = new Lock();
                try {
                    return;
                } finally {
                    lock.close();
                }
            }
        }
        ");
    }

    #[test]
    fn literals() {
        let mut writer = JavaWriter::new(&WriteOptions::default());
        writer.write_literal(&JavaLiteral::Float(1.0));
        writer.output.push(' ');
        writer.write_literal(&JavaLiteral::Long(5_000_000_000));
        writer.output.push(' ');
        writer.write_literal(&JavaLiteral::String("say \"hi\"".into()));
        assert_eq!(writer.output, r#"1.0 5000000000L "say \"hi\"""#);
    }
}
