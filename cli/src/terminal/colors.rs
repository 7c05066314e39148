use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 94, g: 234, b: 212 };
pub const SECONDARY: Color = Color::TrueColor { r: 125, g: 211, b: 252 };
pub const ACCENT: Color = Color::TrueColor { r: 250, g: 204, b: 21 };
pub const SEPARATOR: Color = Color::TrueColor { r: 100, g: 116, b: 139 };
pub const TEXT_DEFAULT: Color = Color::TrueColor { r: 226, g: 232, b: 240 };

pub const IPV4_ADDR: Color = Color::TrueColor { r: 134, g: 239, b: 172 };
pub const IPV4_PREFIX: Color = Color::TrueColor { r: 74, g: 222, b: 128 };
pub const IPV6_ADDR: Color = Color::TrueColor { r: 196, g: 181, b: 253 };
pub const IPV6_PREFIX: Color = Color::TrueColor { r: 167, g: 139, b: 250 };
pub const MAC_ADDR: Color = Color::TrueColor { r: 253, g: 186, b: 116 };

pub const PORT_OPEN: Color = Color::TrueColor { r: 74, g: 222, b: 128 };
pub const ERROR: Color = Color::TrueColor { r: 248, g: 113, b: 113 };
