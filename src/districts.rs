/// One of the 11 Tashkent districts OLX exposes as a search filter.
///
/// The set is closed: the site's district list is effectively static, so the
/// ids live in a fixed table instead of anything dynamic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct District {
    pub id: u32,
    pub name: &'static str,
}

pub const DISTRICTS: [District; 11] = [
    District { id: 26, name: "yakkasarai" },
    District { id: 25, name: "yunusabad" },
    District { id: 24, name: "shaykhantohur" },
    District { id: 23, name: "chilonzor" },
    District { id: 22, name: "yashnabad" },
    District { id: 21, name: "uchtepa" },
    District { id: 20, name: "almazar" },
    District { id: 19, name: "sergeli" },
    District { id: 18, name: "bektemir" },
    District { id: 13, name: "mirabad" },
    District { id: 12, name: "mirzo-ulugbek" },
];

impl District {
    pub fn by_id(id: u32) -> Option<District> {
        DISTRICTS.iter().copied().find(|d| d.id == id)
    }

    /// Filename-safe name, used for all per-district CSV files.
    pub fn slug(&self) -> String {
        self.name.replace(' ', "_").to_lowercase()
    }
}

impl std::fmt::Display for District {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (id={})", self.name, self.id)
    }
}
