use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;

/// How a site is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelStyle {
    #[default]
    SpaceFilling,
    BallAndStick,
    Polyhedra,
    Wireframe,
}

impl ModelStyle {
    /// Instance scale a site receives when its style is applied.
    pub fn default_scale(&self) -> f64 {
        match self {
            ModelStyle::SpaceFilling => 1.0,
            ModelStyle::BallAndStick | ModelStyle::Polyhedra => 0.4,
            ModelStyle::Wireframe => 0.0001,
        }
    }

    /// Wireframe sites are hidden; only their bonds would be drawn.
    pub fn is_visible(&self) -> bool {
        !matches!(self, ModelStyle::Wireframe)
    }

    pub fn index(&self) -> i64 {
        match self {
            ModelStyle::SpaceFilling => 0,
            ModelStyle::BallAndStick => 1,
            ModelStyle::Polyhedra => 2,
            ModelStyle::Wireframe => 3,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(ModelStyle::SpaceFilling),
            1 => Some(ModelStyle::BallAndStick),
            2 => Some(ModelStyle::Polyhedra),
            3 => Some(ModelStyle::Wireframe),
            _ => None,
        }
    }
}

impl FromStr for ModelStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "space-filling" | "space_filling" | "spacefilling" | "0" => {
                Ok(ModelStyle::SpaceFilling)
            }
            "ball-and-stick" | "ball_and_stick" | "ballandstick" | "1" => {
                Ok(ModelStyle::BallAndStick)
            }
            "polyhedra" | "2" => Ok(ModelStyle::Polyhedra),
            "wireframe" | "3" => Ok(ModelStyle::Wireframe),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ModelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelStyle::SpaceFilling => "space-filling",
            ModelStyle::BallAndStick => "ball-and-stick",
            ModelStyle::Polyhedra => "polyhedra",
            ModelStyle::Wireframe => "wireframe",
        };
        f.write_str(name)
    }
}

/// One atomic site of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// Position in the collection's local frame.
    pub position: Point3<f64>,
    /// Label of the species this site belongs to.
    pub species: String,
    pub scale: f64,
    pub show: bool,
    /// Selection group the site is part of.
    pub select: i32,
    pub model_style: ModelStyle,
}

impl Site {
    pub fn new(position: Point3<f64>, species: &str) -> Self {
        Self {
            position,
            species: species.to_string(),
            scale: 1.0,
            show: true,
            select: 0,
            model_style: ModelStyle::default(),
        }
    }

    /// Scale and visibility implied by the site's model style.
    pub fn apply_model_style(&mut self) {
        self.scale = self.model_style.default_scale();
        self.show = self.model_style.is_visible();
    }
}
