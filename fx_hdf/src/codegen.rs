//! Emits Rust host code mirroring the exportable entries of a type table.

use std::fmt::Write;

use crate::parser::{Parser, PrimitiveKind, TypeEntry, TypeKind};

pub struct CodeGenerator {
    pub generate_ui: bool,
}

impl CodeGenerator {
    pub fn new(generate_ui: bool) -> Self {
        Self { generate_ui }
    }

    /// Renders the whole table into one source file.
    pub fn generate(&self, parser: &Parser<'_>) -> String {
        let mut out = String::new();
        out.push_str("// Generated by fxc. Do not edit.\n");

        for entry in parser.types() {
            if !entry.exportable {
                continue;
            }

            match entry.kind {
                TypeKind::Struct => self.output_struct(parser, entry, &mut out),
                TypeKind::Enum => self.output_enum(entry, &mut out),
                TypeKind::Command => self.output_command(parser, entry, &mut out),
                TypeKind::Primitive | TypeKind::None => {}
            }
        }

        out
    }

    fn output_struct(&self, parser: &Parser<'_>, entry: &TypeEntry, out: &mut String) {
        let types = parser.types();

        let all_primitive = entry
            .member_types
            .iter()
            .all(|&index| types[index].kind == TypeKind::Primitive);

        out.push('\n');
        if all_primitive {
            out.push_str("#[derive(Clone, Debug, Default)]\n");
        } else {
            out.push_str("#[derive(Clone, Debug)]\n");
        }
        let _ = writeln!(out, "pub struct {} {{", entry.name);

        for (name, &type_index) in entry.member_names.iter().zip(&entry.member_types) {
            let member_type = &types[type_index];
            match member_type.kind {
                TypeKind::Primitive => {
                    let primitive = member_type.primitive.unwrap_or(PrimitiveKind::Int32);
                    let _ = writeln!(out, "    pub {name}: {},", primitive.rust_name());
                }
                // Struct and enum members are referenced by name.
                _ => {
                    let _ = writeln!(out, "    pub {name}: {},", member_type.name);
                }
            }
        }

        out.push_str("}\n");

        if self.generate_ui {
            self.output_struct_ui(parser, entry, out);
        }
    }

    fn output_struct_ui(&self, parser: &Parser<'_>, entry: &TypeEntry, out: &mut String) {
        let types = parser.types();

        let _ = writeln!(out, "\nimpl {} {{", entry.name);
        out.push_str("    pub fn reflect_members(&mut self, ui: &mut egui::Ui) {\n");

        for (name, &type_index) in entry.member_names.iter().zip(&entry.member_types) {
            let member_type = &types[type_index];
            match member_type.kind {
                TypeKind::Primitive => match member_type.primitive {
                    Some(primitive) if primitive.is_numeric() => {
                        let _ = writeln!(
                            out,
                            "        ui.add(egui::DragValue::new(&mut self.{name}).prefix(\"{name}: \"));"
                        );
                    }
                    _ => {
                        let _ = writeln!(out, "        ui.checkbox(&mut self.{name}, \"{name}\");");
                    }
                },
                TypeKind::Enum => {
                    let _ = writeln!(
                        out,
                        "        egui::ComboBox::from_label(\"{name}\")\n            \
                         .selected_text(format!(\"{{:?}}\", self.{name}))\n            \
                         .show_ui(ui, |ui| {{"
                    );
                    for variant in &member_type.member_names {
                        let _ = writeln!(
                            out,
                            "                ui.selectable_value(&mut self.{name}, {}::{variant}, \"{variant}\");",
                            member_type.name
                        );
                    }
                    out.push_str("            });\n");
                }
                _ => {
                    let _ = writeln!(out, "        ui.label(\"{name}\");");
                    let _ = writeln!(out, "        self.{name}.reflect_members(ui);");
                }
            }
        }

        out.push_str("    }\n\n");
        out.push_str("    pub fn reflect_ui(&mut self, ctx: &egui::Context) {\n");
        let _ = writeln!(
            out,
            "        egui::Window::new(\"{}\").show(ctx, |ui| {{",
            entry.name
        );
        out.push_str("            self.reflect_members(ui);\n");
        out.push_str("        });\n");
        out.push_str("    }\n");
        out.push_str("}\n");
    }

    /// Enums emit the value list plus a bitmask type, a value-name table
    /// and a `to_string` accessor. Empty enums emit nothing at all.
    fn output_enum(&self, entry: &TypeEntry, out: &mut String) {
        if entry.member_names.is_empty() {
            return;
        }

        out.push('\n');
        out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq)]\n");
        out.push_str("#[repr(u32)]\n");
        let _ = writeln!(out, "pub enum {} {{", entry.name);
        for name in &entry.member_names {
            let _ = writeln!(out, "    {name},");
        }
        out.push_str("    Count,\n");
        out.push_str("}\n");

        out.push_str("\nbitflags::bitflags! {\n");
        out.push_str("    #[derive(Copy, Clone, Debug, PartialEq, Eq)]\n");
        let _ = writeln!(out, "    pub struct {}Mask: u32 {{", entry.name);
        for (index, name) in entry.member_names.iter().enumerate() {
            let _ = writeln!(
                out,
                "        const {} = 1 << {index};",
                name.to_uppercase()
            );
        }
        let _ = writeln!(
            out,
            "        const COUNT = 1 << {};",
            entry.member_names.len()
        );
        out.push_str("    }\n");
        out.push_str("}\n");

        let table = format!("{}_NAMES", to_shouty_case(&entry.name));
        let _ = writeln!(
            out,
            "\npub const {table}: [&str; {}] = [",
            entry.member_names.len() + 1
        );
        for name in &entry.member_names {
            let _ = writeln!(out, "    \"{name}\",");
        }
        out.push_str("    \"Count\",\n");
        out.push_str("];\n");

        let _ = writeln!(
            out,
            "\npub fn {}_to_string(value: {}) -> &'static str {{",
            to_snake_case(&entry.name),
            entry.name
        );
        let _ = writeln!(out, "    {table}[value as usize]");
        out.push_str("}\n");
    }

    fn output_command(&self, parser: &Parser<'_>, entry: &TypeEntry, out: &mut String) {
        let types = parser.types();

        let _ = writeln!(out, "\npub mod {} {{", to_snake_case(&entry.name));

        out.push_str("    #[derive(Copy, Clone, Debug, PartialEq, Eq)]\n");
        out.push_str("    pub enum Type {\n");
        for name in &entry.member_names {
            let _ = writeln!(out, "        {name},");
        }
        out.push_str("    }\n");

        for &case_index in &entry.member_types {
            let case = &types[case_index];

            out.push_str("\n    #[derive(Clone, Debug)]\n");
            let _ = writeln!(out, "    pub struct {} {{", case.name);
            for (name, &type_index) in case.member_names.iter().zip(&case.member_types) {
                let member_type = &types[type_index];
                let type_name = match member_type.kind {
                    TypeKind::Primitive => member_type
                        .primitive
                        .unwrap_or(PrimitiveKind::Int32)
                        .rust_name(),
                    _ => member_type.name.as_str(),
                };
                let _ = writeln!(out, "        pub {name}: {type_name},");
            }
            out.push_str("    }\n");

            let _ = writeln!(out, "\n    impl {} {{", case.name);
            out.push_str("        pub fn get_type() -> Type {\n");
            let _ = writeln!(out, "            Type::{}", case.name);
            out.push_str("        }\n");
            out.push_str("    }\n");
        }

        out.push_str("}\n");
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if index != 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn to_shouty_case(name: &str) -> String {
    to_snake_case(name).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::CodeGenerator;
    use crate::parser::Parser;
    use fx_lexer::Lexer;

    fn generate(source: &str, ui: bool) -> String {
        let mut parser = Parser::new(Lexer::new(source), 64);
        parser.generate_ast();
        CodeGenerator::new(ui).generate(&parser)
    }

    #[test]
    fn empty_enum_emits_nothing() {
        let out = generate("enum Empty : int32 { }", false);
        assert!(!out.contains("Empty"));
    }

    #[test]
    fn struct_emits_fields_in_order() {
        let out = generate("struct Vec2 { float x; float y; }", true);

        assert!(out.contains("pub struct Vec2 {"));
        let x = out.find("pub x: f32,").unwrap();
        let y = out.find("pub y: f32,").unwrap();
        assert!(x < y);

        // Two numeric input widgets, in member order.
        assert_eq!(out.matches("egui::DragValue::new").count(), 2);
        assert!(out.contains("pub fn reflect_ui"));
    }

    #[test]
    fn bool_member_gets_checkbox() {
        let out = generate("struct Flags { bool visible; }", true);
        assert!(out.contains("ui.checkbox(&mut self.visible, \"visible\");"));
    }

    #[test]
    fn enum_emits_values_masks_and_names() {
        let out = generate("enum Weapon { Sword Bow }", false);

        assert!(out.contains("pub enum Weapon {"));
        assert!(out.contains("    Count,"));
        assert!(out.contains("pub struct WeaponMask: u32 {"));
        assert!(out.contains("const SWORD = 1 << 0;"));
        assert!(out.contains("const BOW = 1 << 1;"));
        assert!(out.contains("const COUNT = 1 << 2;"));
        assert!(out.contains("pub const WEAPON_NAMES: [&str; 3]"));
        assert!(out.contains("pub fn weapon_to_string(value: Weapon)"));
    }

    #[test]
    fn enum_member_reflects_with_combo_box() {
        let out = generate(
            "enum Mode { Fast Slow } struct Config { Mode mode; }",
            true,
        );

        assert!(out.contains("pub mode: Mode,"));
        assert!(out.contains("egui::ComboBox::from_label(\"mode\")"));
        assert!(out.contains("ui.selectable_value(&mut self.mode, Mode::Fast, \"Fast\");"));
    }

    #[test]
    fn command_emits_module_with_cases() {
        let out = generate(
            "command Render { DrawQuad { float x; } Clear { float r; } }",
            false,
        );

        assert!(out.contains("pub mod render {"));
        assert!(out.contains("pub enum Type {"));
        assert!(out.contains("        DrawQuad,"));
        assert!(out.contains("pub struct DrawQuad {"));
        assert!(out.contains("pub fn get_type() -> Type {"));
        assert!(out.contains("Type::Clear"));
    }
}
