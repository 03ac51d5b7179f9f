use crate::{Kind, Shape, ShapeRef};

/// Describes a field in a struct.
#[derive(Clone, Copy, Debug)]
pub struct Field {
    /// Declared name of the field
    pub name: &'static str,

    /// Shape of the field's type
    pub shape: ShapeRef,

    /// Struct tag metadata, in `name,omitempty,string` form
    pub tag: &'static str,

    /// The field is an embedded sub-structure whose fields are promoted
    pub embedded: bool,

    /// Unexported fields never appear in the output, except embedded
    /// structs, whose exported fields are still promoted
    pub exported: bool,
}

impl Field {
    /// Create an exported, untagged field.
    pub const fn new(name: &'static str, shape: ShapeRef) -> Self {
        Self {
            name,
            shape,
            tag: "",
            embedded: false,
            exported: true,
        }
    }

    /// Set the struct tag.
    pub const fn tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    /// Mark the field as embedded.
    pub const fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    /// Mark the field as unexported.
    pub const fn private(mut self) -> Self {
        self.exported = false;
        self
    }

    /// Returns the shape of the field's type
    pub fn shape(&self) -> &'static Shape {
        (self.shape)()
    }

    /// Parsed tag options.
    pub fn options(&self) -> FieldTag {
        FieldTag::parse(self.tag)
    }

    /// Returns true if the field never appears in the output.
    pub fn should_skip_serializing(&self) -> bool {
        if self.options().skip {
            return true;
        }
        !self.exported && !(self.embedded && self.targets_struct())
    }

    /// Returns true if the field's type is a struct or a pointer to one.
    pub fn targets_struct(&self) -> bool {
        let shape = self.shape();
        let target = match shape.kind {
            Kind::Pointer(elem) => elem(),
            _ => shape,
        };
        matches!(target.kind, Kind::Struct(_))
    }

    /// Key the field is emitted under.
    pub fn json_name(&self) -> &'static str {
        self.options().name.unwrap_or(self.name)
    }
}

/// Struct tag options of one field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldTag {
    /// Renamed key, if the tag names one
    pub name: Option<&'static str>,
    /// `-`: never emit the field
    pub skip: bool,
    /// `omitempty`: drop the field when it holds its zero value
    pub omit_empty: bool,
    /// `string`: quote the field's scalar value
    pub string: bool,
}

impl FieldTag {
    /// Parse tag text such as `id,omitempty`.
    ///
    /// A lone `-` skips the field; `-,` names it `-`. Unknown options are
    /// ignored.
    pub fn parse(tag: &'static str) -> Self {
        if tag == "-" {
            return Self {
                skip: true,
                ..Self::default()
            };
        }
        let mut parts = tag.split(',');
        let name = parts.next().filter(|name| !name.is_empty());
        let mut parsed = Self {
            name,
            ..Self::default()
        };
        for option in parts {
            match option {
                "omitempty" => parsed.omit_empty = true,
                "string" => parsed.string = true,
                _ => {}
            }
        }
        parsed
    }
}
