//! Viewer ids tell the Console how to render a `LogEntry`'s data.

/// Numeric tag selecting a Console viewer for a [`crate::packet::LogEntry`]'s data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerId {
    None,
    Title,
    Data,
    List,
    ValueList,
    Inspector,
    Table,
    Web,
    Binary,
    SourceCode(SourceCodeKind),
    Graphic(GraphicKind),
}

/// Source-code viewer sub-kinds (ids 300-307).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCodeKind {
    Html,
    Javascript,
    Vbscript,
    Perl,
    Sql,
    Ini,
    Python,
    Xml,
}

/// Graphic viewer sub-kinds (ids 400-403).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicKind {
    Bitmap,
    Jpeg,
    Ico,
    Metafile,
}

impl ViewerId {
    /// The stable wire id for this viewer, or `-1` for [`ViewerId::None`].
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::None => -1,
            Self::Title => 0,
            Self::Data => 1,
            Self::List => 2,
            Self::ValueList => 3,
            Self::Inspector => 4,
            Self::Table => 5,
            Self::Web => 100,
            Self::Binary => 200,
            Self::SourceCode(kind) => {
                300 + match kind {
                    SourceCodeKind::Html => 0,
                    SourceCodeKind::Javascript => 1,
                    SourceCodeKind::Vbscript => 2,
                    SourceCodeKind::Perl => 3,
                    SourceCodeKind::Sql => 4,
                    SourceCodeKind::Ini => 5,
                    SourceCodeKind::Python => 6,
                    SourceCodeKind::Xml => 7,
                }
            }
            Self::Graphic(kind) => {
                400 + match kind {
                    GraphicKind::Bitmap => 0,
                    GraphicKind::Jpeg => 1,
                    GraphicKind::Ico => 2,
                    GraphicKind::Metafile => 3,
                }
            }
        }
    }

    /// Reconstructs a `ViewerId` from its wire id. Unknown ids decode as
    /// [`ViewerId::None`], matching the enum-nullability convention in §4.5.
    #[must_use]
    pub fn from_i32(id: i32) -> Self {
        match id {
            0 => Self::Title,
            1 => Self::Data,
            2 => Self::List,
            3 => Self::ValueList,
            4 => Self::Inspector,
            5 => Self::Table,
            100 => Self::Web,
            200 => Self::Binary,
            300 => Self::SourceCode(SourceCodeKind::Html),
            301 => Self::SourceCode(SourceCodeKind::Javascript),
            302 => Self::SourceCode(SourceCodeKind::Vbscript),
            303 => Self::SourceCode(SourceCodeKind::Perl),
            304 => Self::SourceCode(SourceCodeKind::Sql),
            305 => Self::SourceCode(SourceCodeKind::Ini),
            306 => Self::SourceCode(SourceCodeKind::Python),
            307 => Self::SourceCode(SourceCodeKind::Xml),
            400 => Self::Graphic(GraphicKind::Bitmap),
            401 => Self::Graphic(GraphicKind::Jpeg),
            402 => Self::Graphic(GraphicKind::Ico),
            403 => Self::Graphic(GraphicKind::Metafile),
            _ => Self::None,
        }
    }
}
