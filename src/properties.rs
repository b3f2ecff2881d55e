/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Property and unit names known to the parser.

macro_rules! property_ids {
    ( $( $name:tt => $variant:ident, )+ ) => {
        /// A known CSS property or descriptor.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        #[allow(missing_docs)]
        pub enum PropertyId {
            $( $variant, )+
        }

        impl PropertyId {
            /// Look up a property by name, ASCII case-insensitively.
            pub fn from_name(name: &str) -> Option<PropertyId> {
                ascii_case_insensitive_phf_map! {
                    property_id_by_name -> PropertyId = {
                        $( $name => PropertyId::$variant, )+
                    }
                }
                property_id_by_name(name).copied()
            }

            /// The canonical, lower-case name of the property.
            pub fn name(self) -> &'static str {
                match self {
                    $( PropertyId::$variant => $name, )+
                }
            }
        }
    };
}

property_ids! {
    "align-content" => AlignContent,
    "align-items" => AlignItems,
    "align-self" => AlignSelf,
    "animation" => Animation,
    "animation-delay" => AnimationDelay,
    "animation-duration" => AnimationDuration,
    "animation-name" => AnimationName,
    "animation-timing-function" => AnimationTimingFunction,
    "background" => Background,
    "background-color" => BackgroundColor,
    "background-image" => BackgroundImage,
    "background-position" => BackgroundPosition,
    "background-repeat" => BackgroundRepeat,
    "background-size" => BackgroundSize,
    "border" => Border,
    "border-bottom" => BorderBottom,
    "border-color" => BorderColor,
    "border-left" => BorderLeft,
    "border-radius" => BorderRadius,
    "border-right" => BorderRight,
    "border-style" => BorderStyle,
    "border-top" => BorderTop,
    "border-width" => BorderWidth,
    "bottom" => Bottom,
    "box-shadow" => BoxShadow,
    "box-sizing" => BoxSizing,
    "clear" => Clear,
    "color" => Color,
    "content" => Content,
    "cursor" => Cursor,
    "direction" => Direction,
    "display" => Display,
    "flex" => Flex,
    "flex-basis" => FlexBasis,
    "flex-direction" => FlexDirection,
    "flex-grow" => FlexGrow,
    "flex-shrink" => FlexShrink,
    "flex-wrap" => FlexWrap,
    "float" => Float,
    "font" => Font,
    "font-display" => FontDisplay,
    "font-family" => FontFamily,
    "font-size" => FontSize,
    "font-style" => FontStyle,
    "font-weight" => FontWeight,
    "gap" => Gap,
    "grid-template-columns" => GridTemplateColumns,
    "grid-template-rows" => GridTemplateRows,
    "height" => Height,
    "justify-content" => JustifyContent,
    "left" => Left,
    "letter-spacing" => LetterSpacing,
    "line-height" => LineHeight,
    "list-style" => ListStyle,
    "margin" => Margin,
    "margin-bottom" => MarginBottom,
    "margin-left" => MarginLeft,
    "margin-right" => MarginRight,
    "margin-top" => MarginTop,
    "max-height" => MaxHeight,
    "max-width" => MaxWidth,
    "max-zoom" => MaxZoom,
    "min-height" => MinHeight,
    "min-width" => MinWidth,
    "min-zoom" => MinZoom,
    "opacity" => Opacity,
    "order" => Order,
    "orientation" => Orientation,
    "outline" => Outline,
    "overflow" => Overflow,
    "padding" => Padding,
    "padding-bottom" => PaddingBottom,
    "padding-left" => PaddingLeft,
    "padding-right" => PaddingRight,
    "padding-top" => PaddingTop,
    "position" => Position,
    "right" => Right,
    "size" => Size,
    "src" => Src,
    "text-align" => TextAlign,
    "text-decoration" => TextDecoration,
    "text-transform" => TextTransform,
    "top" => Top,
    "transform" => Transform,
    "transition" => Transition,
    "unicode-range" => UnicodeRange,
    "user-zoom" => UserZoom,
    "vertical-align" => VerticalAlign,
    "visibility" => Visibility,
    "white-space" => WhiteSpace,
    "width" => Width,
    "word-spacing" => WordSpacing,
    "z-index" => ZIndex,
    "zoom" => Zoom,
}

/// Whether `name` is a custom property name: `--` followed by at least one character.
#[inline]
pub fn is_custom_property_name(name: &str) -> bool {
    name.len() > 2 && name.starts_with("--")
}

/// The category of a known dimension unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum UnitType {
    /// Absolute and relative lengths, `px`, `em`, `vw` ...
    Length,
    /// `deg`, `rad`, `grad`, `turn`
    Angle,
    /// `s`, `ms`
    Time,
    /// `hz`, `khz`
    Frequency,
    /// `dpi`, `dpcm`, `dppx`, `x`
    Resolution,
    /// `fr`
    Flex,
}

impl UnitType {
    /// The category of `unit`, or `None` if the unit is not known.
    pub fn from_unit(unit: &str) -> Option<UnitType> {
        ascii_case_insensitive_phf_map! {
            unit_type -> UnitType = {
                "px" => UnitType::Length,
                "cm" => UnitType::Length,
                "mm" => UnitType::Length,
                "q" => UnitType::Length,
                "in" => UnitType::Length,
                "pt" => UnitType::Length,
                "pc" => UnitType::Length,
                "em" => UnitType::Length,
                "ex" => UnitType::Length,
                "ch" => UnitType::Length,
                "rem" => UnitType::Length,
                "vw" => UnitType::Length,
                "vh" => UnitType::Length,
                "vmin" => UnitType::Length,
                "vmax" => UnitType::Length,
                "deg" => UnitType::Angle,
                "rad" => UnitType::Angle,
                "grad" => UnitType::Angle,
                "turn" => UnitType::Angle,
                "s" => UnitType::Time,
                "ms" => UnitType::Time,
                "hz" => UnitType::Frequency,
                "khz" => UnitType::Frequency,
                "dpi" => UnitType::Resolution,
                "dpcm" => UnitType::Resolution,
                "dppx" => UnitType::Resolution,
                "x" => UnitType::Resolution,
                "fr" => UnitType::Flex,
            }
        }
        unit_type(unit).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_lookup_is_case_insensitive() {
        assert_eq!(PropertyId::from_name("MIN-Width"), Some(PropertyId::MinWidth));
        assert_eq!(PropertyId::from_name("color"), Some(PropertyId::Color));
        assert_eq!(PropertyId::from_name("colour"), None);
        assert_eq!(PropertyId::MaxWidth.name(), "max-width");
    }

    #[test]
    fn custom_property_names() {
        assert!(is_custom_property_name("--x"));
        assert!(is_custom_property_name("--main-color"));
        assert!(!is_custom_property_name("--"));
        assert!(!is_custom_property_name("-x"));
    }

    #[test]
    fn units() {
        assert_eq!(UnitType::from_unit("PX"), Some(UnitType::Length));
        assert_eq!(UnitType::from_unit("dppx"), Some(UnitType::Resolution));
        assert_eq!(UnitType::from_unit("furlong"), None);
    }
}
