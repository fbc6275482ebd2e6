pub mod thermal_room;
