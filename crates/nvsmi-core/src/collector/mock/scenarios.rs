//! Pre-built tool outputs for testing.
//!
//! The XML documents are trimmed-down but structurally faithful dumps of
//! `nvidia-smi -q -x`: unrelated elements are kept in places so that the
//! parser's "ignore what is not modelled" path is exercised too.

use super::runner::MockRunner;

/// Two devices on driver 470.10. The second card is passively cooled
/// (fan speed `N/A`).
pub const TWO_GPUS_XML: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE nvidia_smi_log SYSTEM "nvsmi_device_v11.dtd">
<nvidia_smi_log>
	<timestamp>Mon Oct 12 09:14:27 2026</timestamp>
	<driver_version>470.10</driver_version>
	<cuda_version>11.4</cuda_version>
	<attached_gpus>2</attached_gpus>
	<gpu id="00000000:01:00.0">
		<product_name>NVIDIA GeForce RTX 3090</product_name>
		<product_brand>GeForce</product_brand>
		<persistence_mode>Enabled</persistence_mode>
		<uuid>GPU-11111111-2222-3333-4444-555555555555</uuid>
		<vbios_version>94.02.42.00.A9</vbios_version>
		<pci>
			<pci_bus>01</pci_bus>
			<pci_device>00</pci_device>
		</pci>
		<fan_speed>30 %</fan_speed>
		<performance_state>P2</performance_state>
		<fb_memory_usage>
			<total>24268 MiB</total>
			<used>1024 MiB</used>
			<free>23244 MiB</free>
		</fb_memory_usage>
		<bar1_memory_usage>
			<total>256 MiB</total>
			<used>5 MiB</used>
			<free>251 MiB</free>
		</bar1_memory_usage>
		<utilization>
			<gpu_util>87 %</gpu_util>
			<memory_util>41 %</memory_util>
			<encoder_util>0 %</encoder_util>
			<decoder_util>5 %</decoder_util>
		</utilization>
		<temperature>
			<gpu_temp>62 C</gpu_temp>
			<gpu_temp_max_threshold>98 C</gpu_temp_max_threshold>
			<gpu_temp_slow_threshold>95 C</gpu_temp_slow_threshold>
		</temperature>
		<power_readings>
			<power_state>P2</power_state>
			<power_management>Supported</power_management>
			<power_draw>250.50 W</power_draw>
			<power_limit>350.00 W</power_limit>
		</power_readings>
		<clocks>
			<graphics_clock>1695 MHz</graphics_clock>
			<sm_clock>1695 MHz</sm_clock>
			<mem_clock>9751 MHz</mem_clock>
			<video_clock>1515 MHz</video_clock>
		</clocks>
		<max_clocks>
			<graphics_clock>2100 MHz</graphics_clock>
			<sm_clock>2100 MHz</sm_clock>
			<mem_clock>9751 MHz</mem_clock>
			<video_clock>1950 MHz</video_clock>
		</max_clocks>
		<processes>
			<process_info>
				<pid>4242</pid>
				<type>C</type>
				<process_name>python3</process_name>
				<used_memory>1010 MiB</used_memory>
			</process_info>
		</processes>
	</gpu>
	<gpu id="00000000:41:00.0">
		<product_name>NVIDIA A100-PCIE-40GB</product_name>
		<product_brand>NVIDIA</product_brand>
		<persistence_mode>Enabled</persistence_mode>
		<uuid>GPU-66666666-7777-8888-9999-000000000000</uuid>
		<vbios_version>92.00.25.00.08</vbios_version>
		<fan_speed>N/A</fan_speed>
		<performance_state>P0</performance_state>
		<fb_memory_usage>
			<total>40536 MiB</total>
			<used>0 MiB</used>
			<free>40536 MiB</free>
		</fb_memory_usage>
		<utilization>
			<gpu_util>0 %</gpu_util>
			<memory_util>0 %</memory_util>
			<encoder_util>0 %</encoder_util>
			<decoder_util>0 %</decoder_util>
		</utilization>
		<temperature>
			<gpu_temp>34 C</gpu_temp>
			<gpu_temp_max_threshold>92 C</gpu_temp_max_threshold>
			<gpu_temp_slow_threshold>89 C</gpu_temp_slow_threshold>
		</temperature>
		<power_readings>
			<power_state>P0</power_state>
			<power_draw>35.12 W</power_draw>
			<power_limit>250.00 W</power_limit>
		</power_readings>
		<clocks>
			<graphics_clock>210 MHz</graphics_clock>
			<sm_clock>210 MHz</sm_clock>
			<mem_clock>1215 MHz</mem_clock>
			<video_clock>585 MHz</video_clock>
		</clocks>
		<max_clocks>
			<graphics_clock>1410 MHz</graphics_clock>
			<sm_clock>1410 MHz</sm_clock>
			<mem_clock>1215 MHz</mem_clock>
			<video_clock>1290 MHz</video_clock>
		</max_clocks>
		<processes>
		</processes>
	</gpu>
</nvidia_smi_log>
"#;

/// Same two devices in the opposite order, as after a PCI re-enumeration.
pub const TWO_GPUS_SWAPPED_XML: &str = r#"<?xml version="1.0" ?>
<nvidia_smi_log>
	<driver_version>470.10</driver_version>
	<attached_gpus>2</attached_gpus>
	<gpu id="00000000:41:00.0">
		<product_name>NVIDIA A100-PCIE-40GB</product_name>
		<uuid>GPU-66666666-7777-8888-9999-000000000000</uuid>
		<vbios_version>92.00.25.00.08</vbios_version>
		<fan_speed>N/A</fan_speed>
		<temperature>
			<gpu_temp>34 C</gpu_temp>
		</temperature>
	</gpu>
	<gpu id="00000000:01:00.0">
		<product_name>NVIDIA GeForce RTX 3090</product_name>
		<uuid>GPU-11111111-2222-3333-4444-555555555555</uuid>
		<vbios_version>94.02.42.00.A9</vbios_version>
		<fan_speed>30 %</fan_speed>
		<temperature>
			<gpu_temp>62 C</gpu_temp>
		</temperature>
	</gpu>
</nvidia_smi_log>
"#;

/// One device on an old driver: no `vbios_version`, no encoder or decoder
/// utilization, no temperature thresholds.
pub const LEGACY_DRIVER_XML: &str = r#"<?xml version="1.0" ?>
<nvidia_smi_log>
	<driver_version>340.108</driver_version>
	<attached_gpus>1</attached_gpus>
	<gpu id="0000:02:00.0">
		<product_name>Tesla K20m</product_name>
		<uuid>GPU-aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee</uuid>
		<fan_speed>N/A</fan_speed>
		<fb_memory_usage>
			<total>4799 MiB</total>
			<used>12 MiB</used>
			<free>4787 MiB</free>
		</fb_memory_usage>
		<utilization>
			<gpu_util>12 %</gpu_util>
			<memory_util>3 %</memory_util>
		</utilization>
		<temperature>
			<gpu_temp>41 C</gpu_temp>
		</temperature>
		<power_readings>
			<power_draw>48.07 W</power_draw>
			<power_limit>225.00 W</power_limit>
		</power_readings>
		<clocks>
			<graphics_clock>705 MHz</graphics_clock>
			<sm_clock>705 MHz</sm_clock>
			<mem_clock>2600 MHz</mem_clock>
		</clocks>
		<max_clocks>
			<graphics_clock>758 MHz</graphics_clock>
			<sm_clock>758 MHz</sm_clock>
			<mem_clock>2600 MHz</mem_clock>
		</max_clocks>
	</gpu>
</nvidia_smi_log>
"#;

/// One device on a recent driver, which renames the power section.
pub const RECENT_DRIVER_XML: &str = r#"<?xml version="1.0" ?>
<nvidia_smi_log>
	<driver_version>550.54.15</driver_version>
	<attached_gpus>1</attached_gpus>
	<gpu id="00000000:01:00.0">
		<product_name>NVIDIA GeForce RTX 4090</product_name>
		<uuid>GPU-12345678-abcd-ef01-2345-6789abcdef01</uuid>
		<vbios_version>95.02.18.80.5F</vbios_version>
		<fan_speed>0 %</fan_speed>
		<fb_memory_usage>
			<total>24564 MiB</total>
			<reserved>346 MiB</reserved>
			<used>2 MiB</used>
			<free>24215 MiB</free>
		</fb_memory_usage>
		<utilization>
			<gpu_util>0 %</gpu_util>
			<memory_util>0 %</memory_util>
			<encoder_util>0 %</encoder_util>
			<decoder_util>0 %</decoder_util>
			<jpeg_util>0 %</jpeg_util>
			<ofa_util>0 %</ofa_util>
		</utilization>
		<temperature>
			<gpu_temp>38 C</gpu_temp>
			<gpu_temp_tlimit>49 C</gpu_temp_tlimit>
			<gpu_temp_max_threshold>90 C</gpu_temp_max_threshold>
			<gpu_temp_slow_threshold>87 C</gpu_temp_slow_threshold>
		</temperature>
		<gpu_power_readings>
			<power_state>P8</power_state>
			<power_draw>31.20 W</power_draw>
			<current_power_limit>450.00 W</current_power_limit>
			<requested_power_limit>450.00 W</requested_power_limit>
		</gpu_power_readings>
		<clocks>
			<graphics_clock>210 MHz</graphics_clock>
			<sm_clock>210 MHz</sm_clock>
			<mem_clock>405 MHz</mem_clock>
			<video_clock>1185 MHz</video_clock>
		</clocks>
		<max_clocks>
			<graphics_clock>3120 MHz</graphics_clock>
			<sm_clock>3120 MHz</sm_clock>
			<mem_clock>10501 MHz</mem_clock>
			<video_clock>2415 MHz</video_clock>
		</max_clocks>
	</gpu>
</nvidia_smi_log>
"#;

/// `--query-gpu` output for the same two devices as [`TWO_GPUS_XML`].
pub const TWO_GPUS_CSV: &str = "\
470.10, NVIDIA GeForce RTX 3090, GPU-11111111-2222-3333-4444-555555555555, 94.02.42.00.A9, 30, 24268, 1024, 23244, 87, 41, 62, 250.50, 350.00, 1695, 1695, 9751, 1515, 2100, 2100, 9751, 1950
470.10, NVIDIA A100-PCIE-40GB, GPU-66666666-7777-8888-9999-000000000000, 92.00.25.00.08, [N/A], 40536, 0, 40536, 0, 0, 34, 35.12, 250.00, 210, 210, 1215, 585, 1410, 1410, 1215, 1290
";

/// What the tool prints when the kernel module is not loaded.
pub const DRIVER_NOT_LOADED: &str = "NVIDIA-SMI has failed because it couldn't communicate \
with the NVIDIA driver. Make sure that the latest NVIDIA driver is installed and running.";

#[allow(dead_code)]
impl MockRunner {
    /// Two healthy devices, XML output.
    pub fn two_gpus() -> Self {
        Self::with_output(TWO_GPUS_XML)
    }

    /// Two healthy devices, CSV query output.
    pub fn two_gpus_csv() -> Self {
        Self::with_output(TWO_GPUS_CSV)
    }

    /// One old device with optional elements missing.
    pub fn legacy_driver() -> Self {
        Self::with_output(LEGACY_DRIVER_XML)
    }

    /// Tool exits non-zero, as when the driver is not loaded.
    pub fn failing() -> Self {
        Self::with_exit("exit status: 9", DRIVER_NOT_LOADED)
    }

    /// Tool exits zero but prints nothing.
    pub fn empty_output() -> Self {
        Self::with_output(Vec::new())
    }
}
